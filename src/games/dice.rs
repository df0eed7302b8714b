//! Die-roll sources
//!
//! The engine only ever asks for "the next face". Production uses
//! [`UniformDice`]; tests and replays use [`SeededDice`], whose sequence is a
//! pure function of its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_FACE: u8 = 1;
pub const MAX_FACE: u8 = 6;

/// Seed used by [`SeededDice::default`]
pub const DEFAULT_SEED: u32 = 0x0bad_5eed;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

/// Capability to produce die faces in `1..=6`
pub trait DiceSource: Send {
    fn next_face(&mut self) -> u8;
}

impl DiceSource for Box<dyn DiceSource> {
    fn next_face(&mut self) -> u8 {
        (**self).next_face()
    }
}

pub fn is_valid_face(face: u8) -> bool {
    (MIN_FACE..=MAX_FACE).contains(&face)
}

/// Uniform faces from an entropy-seeded generator
pub struct UniformDice {
    rng: StdRng,
}

impl UniformDice {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform faces from a fixed 64-bit seed (simulations)
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSource for UniformDice {
    fn next_face(&mut self) -> u8 {
        self.rng.gen_range(MIN_FACE..=MAX_FACE)
    }
}

/// Reproducible faces from a 32-bit linear congruential generator.
///
/// Not suitable for real stakes: configuration refuses it in production.
#[derive(Debug, Clone)]
pub struct SeededDice {
    initial_seed: u32,
    state: u32,
}

impl SeededDice {
    pub fn new(seed: u32) -> Self {
        Self {
            initial_seed: seed,
            state: seed,
        }
    }

    /// Restart the sequence from `seed`, or from the original seed
    pub fn reset(&mut self, seed: Option<u32>) {
        self.state = seed.unwrap_or(self.initial_seed);
    }

    /// Current generator state
    pub fn seed(&self) -> u32 {
        self.state
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }
}

impl Default for SeededDice {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl DiceSource for SeededDice {
    fn next_face(&mut self) -> u8 {
        (self.next_u32() % MAX_FACE as u32) as u8 + MIN_FACE
    }
}
