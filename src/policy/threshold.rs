//! Threshold reroll policy for the computer player.
//!
//! The computer keeps every die at or above a threshold and redraws the
//! rest. The threshold rises when the computer is behind, and rises again
//! when it is behind and still far from the target.

use crate::dice::{DiceSet, DieSource};

/// Points still needed above which a trailing computer chases sixes.
pub const CHASE_MARGIN: i64 = 20;

/// Keep threshold when trailing and far from the target.
const TRAILING_FAR: u8 = 6;
/// Keep threshold when trailing and close to the target.
const TRAILING_NEAR: u8 = 5;
/// Keep threshold when level or leading.
const LEADING: u8 = 4;

/// Score context the policy decides against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub computer_score: u32,
    pub human_score: u32,
    pub target_score: u32,
}

/// Minimum face the computer keeps without redrawing.
pub fn threshold(input: PolicyInput) -> u8 {
    let points_needed = i64::from(input.target_score) - i64::from(input.computer_score);
    let trailing = input.computer_score < input.human_score;
    if trailing {
        if points_needed > CHASE_MARGIN {
            TRAILING_FAR
        } else {
            TRAILING_NEAR
        }
    } else {
        LEADING
    }
}

/// Returns the computer's next dice: faces below the threshold are redrawn.
///
/// The threshold is derived from `input` on every call.
pub fn decide(current: &DiceSet, input: PolicyInput, source: &mut dyn DieSource) -> DiceSet {
    let keep_from = threshold(input);
    current.reroll_where(source, |_, die| die.value() < keep_from)
}
