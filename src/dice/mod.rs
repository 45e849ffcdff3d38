//! Dice primitives.
//!
//! Face values, five-dice sets, hold selections, and the injectable draw
//! source used by both the round engine and the computer policy.

pub mod die;
pub mod source;

pub use die::{Die, DiceSet, HoldSelection, DICE_PER_SET, MAX_HELD};
pub use source::{DieSource, RngDice, ScriptedDice};
