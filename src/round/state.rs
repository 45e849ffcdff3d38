//! Round state types and the rendering snapshot.
//!
//! Everything the presentation layer may observe about a round is copied
//! into a `Snapshot`; nothing outside the engine mutates these types.

use serde::{Deserialize, Serialize};

use crate::dice::{DiceSet, DICE_PER_SET};

/// Target score used when none (or an invalid one) is configured.
pub const DEFAULT_TARGET_SCORE: u32 = 101;

/// Rolls per turn, including the first throw.
pub const MAX_ROLLS: u8 = 3;

/// One side of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Human,
    Computer,
}

impl Side {
    pub const fn name(self) -> &'static str {
        match self {
            Side::Human => "human",
            Side::Computer => "computer",
        }
    }
}

/// Where a round is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Phase {
    AwaitingTargetConfig,
    InProgress,
    TieBreaker,
    Concluded { winner: Side },
}

/// Running scores and the target for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreState {
    pub human_score: u32,
    pub computer_score: u32,
    pub target_score: u32,
}

impl ScoreState {
    pub const fn new(target_score: u32) -> Self {
        ScoreState {
            human_score: 0,
            computer_score: 0,
            target_score,
        }
    }

    /// True once either side has reached the target.
    pub const fn target_reached(&self) -> bool {
        self.human_score >= self.target_score || self.computer_score >= self.target_score
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        ScoreState::new(DEFAULT_TARGET_SCORE)
    }
}

/// Roll and turn bookkeeping for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnCounters {
    /// Rolls taken this turn, 0..=3.
    pub roll_count: u8,
    /// Turns completed this round.
    pub turn_count: u32,
}

/// Rounds won per side. Survives new rounds within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTally {
    pub human_wins: u32,
    pub computer_wins: u32,
}

impl RoundTally {
    pub fn record(&mut self, winner: Side) {
        match winner {
            Side::Human => self.human_wins += 1,
            Side::Computer => self.computer_wins += 1,
        }
    }

    pub const fn total(&self) -> u32 {
        self.human_wins + self.computer_wins
    }
}

/// Label of the primary action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionLabel {
    #[serde(rename = "Throw")]
    Throw,
    #[serde(rename = "Re-roll")]
    Reroll,
    #[serde(rename = "Tie Breaker Roll!")]
    TieBreakerRoll,
}

impl ActionLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActionLabel::Throw => "Throw",
            ActionLabel::Reroll => "Re-roll",
            ActionLabel::TieBreakerRoll => "Tie Breaker Roll!",
        }
    }
}

/// Immutable view of a round for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// `None` until the first throw of the round.
    pub human_dice: Option<[u8; DICE_PER_SET]>,
    pub computer_dice: Option<[u8; DICE_PER_SET]>,
    pub human_score: u32,
    pub computer_score: u32,
    pub human_wins: u32,
    pub computer_wins: u32,
    pub target_score: u32,
    pub phase: Phase,
    pub held_indices: Vec<usize>,
    pub dice_interactive: bool,
    pub computer_rolling: bool,
    pub primary_action_label: ActionLabel,
    pub primary_action_enabled: bool,
    pub score_enabled: bool,
    pub last_error: Option<String>,
    pub human_roll_count: u8,
    pub computer_roll_count: u8,
    pub human_turn_count: u32,
    pub computer_turn_count: u32,
    /// End-of-round banner from the human's point of view.
    pub outcome: Option<String>,
}

/// Banner shown when a round concludes.
pub fn outcome_banner(winner: Side) -> &'static str {
    match winner {
        Side::Human => "You Win!",
        Side::Computer => "You Lose!",
    }
}

pub(crate) fn dice_values(dice: Option<DiceSet>) -> Option<[u8; DICE_PER_SET]> {
    dice.map(|d| d.values())
}
