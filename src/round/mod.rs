//! Turn and round state machine.
//!
//! Holds the round lifecycle, roll and hold bookkeeping, scoring, and win
//! detection. The computer's rerolls are delegated to [`crate::policy`].

pub mod error;
pub mod machine;
pub mod state;

pub use error::ValidationError;
pub use machine::{
    parse_target, target_or_default, HoldChange, Resolution, RoundEngine, ThrowOutcome,
    TurnResult,
};
pub use state::{
    outcome_banner, ActionLabel, Phase, RoundTally, ScoreState, Side, Snapshot, TurnCounters,
    DEFAULT_TARGET_SCORE, MAX_ROLLS,
};
