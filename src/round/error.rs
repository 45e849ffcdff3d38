//! Validation failures surfaced to the player.

use thiserror::Error;

use crate::dice::MAX_HELD;

/// A rejected player intent. The round state is left unchanged.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select at least one die to hold before re-rolling.")]
    EmptyHold,

    #[error("Maximum of {} dice can be selected.", MAX_HELD)]
    TooManyHeld,
}
