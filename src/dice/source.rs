//! Injectable sources of die draws.
//!
//! The engine never touches an RNG directly; every draw goes through a
//! `DieSource`. `RngDice` is the production source, `ScriptedDice` replays
//! a fixed sequence so whole rounds can be reproduced in tests.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::die::Die;

/// Produces independent uniform draws in 1..=6.
pub trait DieSource: Send {
    fn next_die(&mut self) -> Die;
}

/// Uniform draws from a random number generator.
pub struct RngDice {
    rng: SmallRng,
}

impl RngDice {
    /// Seeds from OS entropy.
    pub fn from_entropy() -> Self {
        RngDice {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic source for a given seed.
    pub fn seeded(seed: u64) -> Self {
        RngDice {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }
}

impl DieSource for RngDice {
    fn next_die(&mut self) -> Die {
        Die::clamped(self.rng.gen_range(Die::MIN..=Die::MAX))
    }
}

/// Replays a fixed sequence of faces, wrapping around when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: Vec<Die>,
    cursor: usize,
}

impl ScriptedDice {
    /// Returns `None` if `values` is empty or contains a face outside 1..=6.
    pub fn new(values: &[u8]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let faces = values
            .iter()
            .map(|&v| Die::new(v))
            .collect::<Option<Vec<_>>>()?;
        Some(ScriptedDice { faces, cursor: 0 })
    }

    /// Number of draws consumed so far.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl DieSource for ScriptedDice {
    fn next_die(&mut self) -> Die {
        let die = self.faces[self.cursor % self.faces.len()];
        self.cursor += 1;
        die
    }
}
