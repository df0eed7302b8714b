//! Street Craps - two-party wagering engine
//!
//! A ledger of principal balances plus a table of heads-up pass-line games.
//! Each game escrows a matching stake from both players, resolves by dice,
//! an admin decision or a forfeit, and pays the pot to the winner.
//!
//! ```no_run
//! use street_craps::{SeededDice, WagerEngine};
//!
//! let engine = WagerEngine::new(SeededDice::new(2));
//! engine.fund("alice", 10_000)?;
//! engine.fund("bob", 10_000)?;
//! engine.create("g01", "alice", 1_000)?;
//! engine.join("g01", "bob")?;
//! let roll = engine.roll("g01", "alice")?;
//! println!("rolled {:?}", roll.dice);
//! # Ok::<(), street_craps::WagerError>(())
//! ```

pub mod config;
pub mod errors;
pub mod game_store;
pub mod games;
pub mod ledger;
pub mod metrics;
pub mod storage;

pub use config::{ConfigLoader, CrapsConfig, EngineConfig};
pub use errors::{CrapsError, CrapsResult, ErrorKind, WagerError, WagerResult};
pub use game_store::{load_snapshot, save_snapshot, EngineSnapshot};
pub use games::{
    DiceSource, Game, GameStatus, PlayerState, RollPhase, RollResult, SeededDice, UniformDice,
    WagerEngine,
};
pub use ledger::Ledger;
pub use metrics::MetricsSnapshot;
