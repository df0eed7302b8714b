pub mod dice;
pub mod engine;
pub mod rules;
pub mod types;

pub use dice::{DiceSource, SeededDice, UniformDice};
pub use engine::{generate_game_id, WagerEngine};
pub use rules::{RollOutcome, Side};
pub use types::*;
