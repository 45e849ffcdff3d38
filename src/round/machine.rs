//! The round state machine.
//!
//! `RoundEngine` owns every piece of per-round state and applies player
//! intents to it. Scoring is split into explicit steps (`begin_scoring`,
//! `computer_step`, `finish_scoring`) so an async driver can pause between
//! the computer's rerolls; `score_now` runs them back to back.

use tracing::{debug, info, trace};

use super::error::ValidationError;
use super::state::{
    dice_values, outcome_banner, ActionLabel, Phase, RoundTally, ScoreState, Side, Snapshot,
    TurnCounters, DEFAULT_TARGET_SCORE, MAX_ROLLS,
};
use crate::dice::{DiceSet, DieSource, HoldSelection, DICE_PER_SET, MAX_HELD};
use crate::policy::{self, PolicyInput};

/// Result of a throw/re-roll intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrowOutcome {
    /// The intent does not apply in the current state.
    Ignored,
    /// First roll of a turn; both sides rolled.
    Thrown,
    /// Unheld human dice were redrawn.
    Rerolled,
    /// Third human roll; scoring has begun and must be driven to completion.
    ScoringStarted,
    /// Both sides rolled for a tie-breaker turn.
    TieBreakerRoll,
}

/// Result of a hold toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldChange {
    Held,
    Released,
    Ignored,
}

/// How a scored turn left the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Continue,
    TieBreaker,
    Concluded(Side),
}

/// Points banked by a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnResult {
    pub human_points: u32,
    pub computer_points: u32,
    pub resolution: Resolution,
}

/// Dice and counters for one side.
#[derive(Debug, Clone, Copy, Default)]
struct SideState {
    dice: Option<DiceSet>,
    counters: TurnCounters,
}

/// Maps a requested target to a usable one. Non-positive values fall back to the default.
pub fn target_or_default(requested: i64) -> u32 {
    u32::try_from(requested)
        .ok()
        .filter(|&t| t > 0)
        .unwrap_or(DEFAULT_TARGET_SCORE)
}

/// Parses a typed target. Anything that is not a positive integer yields the default.
pub fn parse_target(raw: &str) -> u32 {
    raw.trim()
        .parse::<i64>()
        .map(target_or_default)
        .unwrap_or(DEFAULT_TARGET_SCORE)
}

/// Owns all turn and round state for one table.
pub struct RoundEngine {
    source: Box<dyn DieSource>,
    phase: Phase,
    scores: ScoreState,
    human: SideState,
    computer: SideState,
    held: HoldSelection,
    tally: RoundTally,
    dice_interactive: bool,
    computer_rolling: bool,
    scoring: bool,
    last_error: Option<ValidationError>,
}

impl RoundEngine {
    /// Creates an engine awaiting target configuration.
    pub fn new(source: Box<dyn DieSource>) -> Self {
        RoundEngine {
            source,
            phase: Phase::AwaitingTargetConfig,
            scores: ScoreState::default(),
            human: SideState::default(),
            computer: SideState::default(),
            held: HoldSelection::new(),
            tally: RoundTally::default(),
            dice_interactive: false,
            computer_rolling: false,
            scoring: false,
            last_error: None,
        }
    }

    pub fn with_source<S: DieSource + 'static>(source: S) -> Self {
        RoundEngine::new(Box::new(source))
    }

    /// Swaps the die source. Takes effect on the next draw.
    pub fn replace_source(&mut self, source: Box<dyn DieSource>) {
        self.source = source;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scores(&self) -> ScoreState {
        self.scores
    }

    pub fn tally(&self) -> RoundTally {
        self.tally
    }

    pub fn human_dice(&self) -> Option<DiceSet> {
        self.human.dice
    }

    pub fn computer_dice(&self) -> Option<DiceSet> {
        self.computer.dice
    }

    pub fn held(&self) -> HoldSelection {
        self.held
    }

    pub fn human_counters(&self) -> TurnCounters {
        self.human.counters
    }

    pub fn computer_counters(&self) -> TurnCounters {
        self.computer.counters
    }

    /// True while a scoring sequence is in flight.
    pub fn is_scoring(&self) -> bool {
        self.scoring
    }

    pub fn last_error(&self) -> Option<ValidationError> {
        self.last_error
    }

    /// Returns and clears the pending validation error.
    pub fn take_error(&mut self) -> Option<ValidationError> {
        self.last_error.take()
    }

    /// Sets the target and starts the round. Only honoured while awaiting configuration.
    ///
    /// Returns the target in effect afterwards.
    pub fn configure(&mut self, requested: i64) -> u32 {
        if self.scoring || self.phase != Phase::AwaitingTargetConfig {
            debug!(requested, phase = ?self.phase, "target already configured, ignoring");
            return self.scores.target_score;
        }
        let target_score = target_or_default(requested);
        if i64::from(target_score) != requested {
            debug!(requested, target_score, "invalid target, using default");
        }
        self.scores.target_score = target_score;
        self.phase = Phase::InProgress;
        info!(target_score, "round configured");
        target_score
    }

    /// Like [`configure`](Self::configure) but takes the raw typed text.
    pub fn configure_str(&mut self, raw: &str) -> u32 {
        self.configure(i64::from(parse_target(raw)))
    }

    /// The primary action: first throw, re-roll, or tie-breaker roll.
    pub fn throw_or_reroll(&mut self) -> Result<ThrowOutcome, ValidationError> {
        if self.scoring {
            trace!("throw ignored while scoring");
            return Ok(ThrowOutcome::Ignored);
        }
        match self.phase {
            Phase::TieBreaker => {
                self.last_error = None;
                self.human.dice = Some(DiceSet::roll(self.source.as_mut()));
                self.computer.dice = Some(DiceSet::roll(self.source.as_mut()));
                self.dice_interactive = true;
                debug!(
                    human = ?self.human.dice.map(|d| d.values()),
                    computer = ?self.computer.dice.map(|d| d.values()),
                    "tie-breaker roll"
                );
                return Ok(ThrowOutcome::TieBreakerRoll);
            }
            Phase::InProgress => {}
            Phase::AwaitingTargetConfig | Phase::Concluded { .. } => {
                trace!(phase = ?self.phase, "throw ignored");
                return Ok(ThrowOutcome::Ignored);
            }
        }

        match self.human.counters.roll_count {
            0 => {
                self.last_error = None;
                self.human.dice = Some(DiceSet::roll(self.source.as_mut()));
                self.computer.dice = Some(DiceSet::roll(self.source.as_mut()));
                self.human.counters.roll_count = 1;
                self.computer.counters.roll_count = 1;
                self.dice_interactive = true;
                debug!(
                    human = ?self.human.dice.map(|d| d.values()),
                    computer = ?self.computer.dice.map(|d| d.values()),
                    "first throw"
                );
                Ok(ThrowOutcome::Thrown)
            }
            rolls if rolls < MAX_ROLLS => {
                if self.held.is_empty() {
                    let err = ValidationError::EmptyHold;
                    debug!(%err, "re-roll rejected");
                    self.last_error = Some(err);
                    return Err(err);
                }
                let Some(current) = self.human.dice else {
                    return Ok(ThrowOutcome::Ignored);
                };
                self.last_error = None;
                let held = self.held;
                self.human.dice = Some(current.reroll_unheld(held, self.source.as_mut()));
                self.human.counters.roll_count += 1;
                self.held.clear();
                self.dice_interactive = true;
                debug!(
                    held = ?held.indices(),
                    dice = ?self.human.dice.map(|d| d.values()),
                    roll = self.human.counters.roll_count,
                    "human re-roll"
                );
                if self.human.counters.roll_count == MAX_ROLLS {
                    self.begin_scoring();
                    return Ok(ThrowOutcome::ScoringStarted);
                }
                Ok(ThrowOutcome::Rerolled)
            }
            _ => Ok(ThrowOutcome::Ignored),
        }
    }

    /// Toggles whether the human die at `index` is held for the next re-roll.
    pub fn toggle_hold(&mut self, index: usize) -> Result<HoldChange, ValidationError> {
        let rolls = self.human.counters.roll_count;
        if self.scoring
            || self.phase != Phase::InProgress
            || !(1..MAX_ROLLS).contains(&rolls)
            || !self.dice_interactive
            || index >= DICE_PER_SET
        {
            trace!(index, "hold ignored");
            return Ok(HoldChange::Ignored);
        }
        if self.held.remove(index) {
            return Ok(HoldChange::Released);
        }
        if self.held.len() >= MAX_HELD {
            let err = ValidationError::TooManyHeld;
            debug!(index, %err, "hold rejected");
            self.last_error = Some(err);
            return Err(err);
        }
        self.held.insert(index);
        Ok(HoldChange::Held)
    }

    /// First scoring step: locks the dice and marks scoring in flight.
    ///
    /// Returns false if there is nothing to score or scoring is already running.
    pub fn begin_scoring(&mut self) -> bool {
        if self.scoring {
            trace!("score ignored, already in flight");
            return false;
        }
        if !self.dice_interactive || !matches!(self.phase, Phase::InProgress | Phase::TieBreaker) {
            trace!(phase = ?self.phase, "score ignored");
            return false;
        }
        self.scoring = true;
        self.dice_interactive = false;
        true
    }

    /// One computer re-roll. Returns false once the computer has no rolls left.
    pub fn computer_step(&mut self) -> bool {
        if !self.scoring
            || self.phase == Phase::TieBreaker
            || self.computer.counters.roll_count >= MAX_ROLLS
        {
            return false;
        }
        let Some(current) = self.computer.dice else {
            return false;
        };
        self.computer_rolling = true;
        let input = PolicyInput {
            computer_score: self.scores.computer_score,
            human_score: self.scores.human_score,
            target_score: self.scores.target_score,
        };
        let next = policy::decide(&current, input, self.source.as_mut());
        self.computer.dice = Some(next);
        self.computer.counters.roll_count += 1;
        debug!(
            dice = ?next.values(),
            roll = self.computer.counters.roll_count,
            "computer re-roll"
        );
        true
    }

    /// Final scoring step: banks both sums, checks for a winner, and resets the turn.
    pub fn finish_scoring(&mut self) -> Option<TurnResult> {
        if !self.scoring {
            return None;
        }
        self.computer_rolling = false;

        let human_points = self.human.dice.map_or(0, |d| d.sum());
        let computer_points = self.computer.dice.map_or(0, |d| d.sum());
        self.scores.human_score += human_points;
        self.scores.computer_score += computer_points;
        self.human.counters.turn_count += 1;
        self.computer.counters.turn_count += 1;

        let resolution = self.resolve();
        info!(
            human_points,
            computer_points,
            human_score = self.scores.human_score,
            computer_score = self.scores.computer_score,
            ?resolution,
            "turn scored"
        );

        self.human.counters.roll_count = 0;
        self.computer.counters.roll_count = 0;
        self.held.clear();
        self.scoring = false;

        Some(TurnResult {
            human_points,
            computer_points,
            resolution,
        })
    }

    /// Runs the remaining computer re-rolls and banks the turn without pausing.
    pub fn complete_scoring(&mut self) -> Option<TurnResult> {
        while self.computer_step() {}
        self.finish_scoring()
    }

    /// Full scoring sequence without pacing.
    pub fn score_now(&mut self) -> Option<TurnResult> {
        if !self.begin_scoring() {
            return None;
        }
        self.complete_scoring()
    }

    /// Resets per-round state, keeping the win tally. Ignored while scoring.
    pub fn start_new_round(&mut self) -> bool {
        if self.scoring {
            debug!("new round ignored while scoring");
            return false;
        }
        self.phase = Phase::AwaitingTargetConfig;
        self.scores = ScoreState::default();
        self.human = SideState::default();
        self.computer = SideState::default();
        self.held.clear();
        self.dice_interactive = false;
        self.computer_rolling = false;
        self.last_error = None;
        info!(
            human_wins = self.tally.human_wins,
            computer_wins = self.tally.computer_wins,
            "new round"
        );
        true
    }

    fn resolve(&mut self) -> Resolution {
        if !self.scores.target_reached() {
            return Resolution::Continue;
        }
        // Both turn counts advance together in finish_scoring.
        debug_assert_eq!(
            self.human.counters.turn_count, self.computer.counters.turn_count,
            "turn counts out of step"
        );
        let (human, computer) = (self.scores.human_score, self.scores.computer_score);
        if human == computer {
            if self.phase != Phase::TieBreaker {
                info!(score = human, "scores level past target, tie-breaker");
            }
            self.phase = Phase::TieBreaker;
            return Resolution::TieBreaker;
        }
        let winner = if human > computer {
            Side::Human
        } else {
            Side::Computer
        };
        self.tally.record(winner);
        self.phase = Phase::Concluded { winner };
        info!(winner = winner.name(), human, computer, "round concluded");
        Resolution::Concluded(winner)
    }

    fn primary_action(&self) -> (ActionLabel, bool) {
        match self.phase {
            Phase::TieBreaker => (ActionLabel::TieBreakerRoll, !self.scoring),
            Phase::InProgress => match self.human.counters.roll_count {
                0 => (ActionLabel::Throw, !self.scoring),
                rolls if rolls < MAX_ROLLS => (ActionLabel::Reroll, !self.scoring),
                _ => (ActionLabel::Reroll, false),
            },
            Phase::AwaitingTargetConfig | Phase::Concluded { .. } => (ActionLabel::Throw, false),
        }
    }

    /// Copies the observable state for rendering.
    pub fn snapshot(&self) -> Snapshot {
        let (primary_action_label, primary_action_enabled) = self.primary_action();
        let outcome = match self.phase {
            Phase::Concluded { winner } => Some(outcome_banner(winner).to_string()),
            _ => None,
        };
        Snapshot {
            human_dice: dice_values(self.human.dice),
            computer_dice: dice_values(self.computer.dice),
            human_score: self.scores.human_score,
            computer_score: self.scores.computer_score,
            human_wins: self.tally.human_wins,
            computer_wins: self.tally.computer_wins,
            target_score: self.scores.target_score,
            phase: self.phase,
            held_indices: self.held.indices(),
            dice_interactive: self.dice_interactive,
            computer_rolling: self.computer_rolling,
            primary_action_label,
            primary_action_enabled,
            score_enabled: self.dice_interactive && !self.computer_rolling && !self.scoring,
            last_error: self.last_error.map(|e| e.to_string()),
            human_roll_count: self.human.counters.roll_count,
            computer_roll_count: self.computer.counters.roll_count,
            human_turn_count: self.human.counters.turn_count,
            computer_turn_count: self.computer.counters.turn_count,
            outcome,
        }
    }
}
