//! Self-play round generation.
//!
//! Plays full rounds against the computer policy with a simple stand-in for
//! the human: hold every die showing four or more, re-roll the rest, and bank
//! once nothing is worth re-rolling. Rounds run without pacing, sequentially
//! or in parallel, and are recorded as JSONL for later analysis.

use std::io::Write;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::dice::{DiceSet, DieSource, HoldSelection, RngDice, MAX_HELD};
use crate::round::{HoldChange, Phase, RoundEngine, Side, ThrowOutcome, DEFAULT_TARGET_SCORE};

/// Faces the stand-in human keeps.
const KEEP_FROM: u8 = 4;

/// Upper bound on regular turns in one round. A round always ends well before
/// this since every turn banks at least five points per side.
const MAX_TURNS: u32 = 10_000;

/// Errors from running self-play.
#[derive(Debug, Error)]
pub enum SelfPlayError {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for self-play.
#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    /// Number of rounds to play.
    pub num_rounds: usize,
    /// Target score for every round.
    pub target_score: u32,
    /// Number of parallel threads.
    pub threads: usize,
    /// Base seed; round `i` uses `seed + i`. `None` seeds every round from entropy.
    pub seed: Option<u64>,
    /// Tie-breaker turns allowed before a round is recorded as unresolved.
    pub max_tie_breakers: u32,
    /// Suppress per-round progress logging.
    pub quiet: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_rounds: 100,
            target_score: DEFAULT_TARGET_SCORE,
            threads: 4,
            seed: None,
            max_tie_breakers: 50,
            quiet: false,
        }
    }
}

/// Outcome of one simulated round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub round_id: usize,
    pub target_score: u32,
    pub human_score: u32,
    pub computer_score: u32,
    /// Completed turns, including tie-breaker turns.
    pub turns: u32,
    pub tie_breaker_turns: u32,
    /// `None` if the tie-breaker cap was hit.
    pub winner: Option<Side>,
}

/// Aggregate results across rounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rounds: usize,
    pub human_wins: usize,
    pub computer_wins: usize,
    pub unresolved: usize,
    pub human_win_rate: f64,
    pub average_turns: f64,
    pub tie_breaker_rounds: usize,
}

/// Chooses which dice the stand-in human holds.
///
/// Returns `None` when every die is worth keeping and the turn should be banked.
pub fn stand_in_holds(dice: &DiceSet) -> Option<HoldSelection> {
    let keep = HoldSelection::from_indices(
        dice.iter()
            .enumerate()
            .filter(|(_, d)| d.value() >= KEEP_FROM)
            .map(|(i, _)| i),
    );
    if keep.len() > MAX_HELD {
        return None;
    }
    if keep.is_empty() {
        // Must hold something to re-roll: keep the first highest die.
        let best = dice
            .iter()
            .enumerate()
            .max_by_key(|&(i, d)| (d, std::cmp::Reverse(i)))
            .map(|(i, _)| i)?;
        return Some(HoldSelection::from_indices([best]));
    }
    Some(keep)
}

/// Plays one regular turn: throw, re-roll per the stand-in, then score.
fn play_turn(engine: &mut RoundEngine) {
    if engine.throw_or_reroll() != Ok(ThrowOutcome::Thrown) {
        engine.score_now();
        return;
    }
    loop {
        let Some(dice) = engine.human_dice() else {
            return;
        };
        let Some(holds) = stand_in_holds(&dice) else {
            engine.score_now();
            return;
        };
        for index in holds.indices() {
            let change = engine.toggle_hold(index);
            debug_assert_eq!(change, Ok(HoldChange::Held), "stand-in hold at {index}");
        }
        match engine.throw_or_reroll() {
            Ok(ThrowOutcome::Rerolled) => continue,
            Ok(ThrowOutcome::ScoringStarted) => {
                engine.complete_scoring();
                return;
            }
            _ => {
                engine.score_now();
                return;
            }
        }
    }
}

/// Plays one full round and returns its record.
pub fn play_round(config: &SelfPlayConfig, round_id: usize, source: Box<dyn DieSource>) -> RoundRecord {
    let mut engine = RoundEngine::new(source);
    engine.configure(i64::from(config.target_score));
    let mut tie_breaker_turns = 0u32;

    let winner = loop {
        match engine.phase() {
            Phase::Concluded { winner } => break Some(winner),
            Phase::TieBreaker => {
                if tie_breaker_turns >= config.max_tie_breakers {
                    break None;
                }
                let roll = engine.throw_or_reroll();
                debug_assert_eq!(roll, Ok(ThrowOutcome::TieBreakerRoll));
                engine.score_now();
                tie_breaker_turns += 1;
            }
            Phase::InProgress => {
                if engine.human_counters().turn_count >= MAX_TURNS {
                    break None;
                }
                play_turn(&mut engine);
            }
            Phase::AwaitingTargetConfig => break None,
        }
    };

    let scores = engine.scores();
    RoundRecord {
        round_id,
        target_score: scores.target_score,
        human_score: scores.human_score,
        computer_score: scores.computer_score,
        turns: engine.human_counters().turn_count,
        tie_breaker_turns,
        winner,
    }
}

fn source_for(config: &SelfPlayConfig, round_id: usize) -> Box<dyn DieSource> {
    let seed = config.seed.map(|s| s.wrapping_add(round_id as u64));
    Box::new(RngDice::from_seed_option(seed))
}

fn log_round(config: &SelfPlayConfig, record: &RoundRecord) {
    if config.quiet {
        return;
    }
    let outcome = record.winner.map_or("unresolved", Side::name);
    debug!(
        round = record.round_id + 1,
        of = config.num_rounds,
        outcome,
        human = record.human_score,
        computer = record.computer_score,
        turns = record.turns,
        "round finished"
    );
}

/// Runs self-play and returns records ordered by round id.
pub fn run_self_play(config: &SelfPlayConfig) -> Result<Vec<RoundRecord>, SelfPlayError> {
    let start = Instant::now();
    let records = if config.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        pool.install(|| {
            (0..config.num_rounds)
                .into_par_iter()
                .map(|i| {
                    let record = play_round(config, i, source_for(config, i));
                    log_round(config, &record);
                    record
                })
                .collect::<Vec<_>>()
        })
    } else {
        (0..config.num_rounds)
            .map(|i| {
                let record = play_round(config, i, source_for(config, i));
                log_round(config, &record);
                record
            })
            .collect()
    };
    info!(
        rounds = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "self-play complete"
    );
    Ok(records)
}

/// Aggregates win counts and turn statistics.
pub fn summarize(records: &[RoundRecord]) -> Summary {
    let rounds = records.len();
    let count = |side: Side| records.iter().filter(|r| r.winner == Some(side)).count();
    let human_wins = count(Side::Human);
    let computer_wins = count(Side::Computer);
    let total_turns: u64 = records.iter().map(|r| u64::from(r.turns)).sum();
    let ratio = |n: f64| if rounds == 0 { 0.0 } else { n / rounds as f64 };
    Summary {
        rounds,
        human_wins,
        computer_wins,
        unresolved: rounds - human_wins - computer_wins,
        human_win_rate: ratio(human_wins as f64),
        average_turns: ratio(total_turns as f64),
        tie_breaker_rounds: records.iter().filter(|r| r.tie_breaker_turns > 0).count(),
    }
}

/// Writes a human-readable summary.
pub fn write_summary<W: Write>(summary: &Summary, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Rounds:            {}", summary.rounds)?;
    writeln!(
        out,
        "Human wins:        {} ({:.1}%)",
        summary.human_wins,
        summary.human_win_rate * 100.0
    )?;
    writeln!(out, "Computer wins:     {}", summary.computer_wins)?;
    writeln!(out, "Unresolved:        {}", summary.unresolved)?;
    writeln!(out, "Average turns:     {:.2}", summary.average_turns)?;
    writeln!(out, "Tie-breaker rounds: {}", summary.tie_breaker_rounds)
}

/// Writes records as JSONL (one JSON object per round, one per line).
pub fn write_jsonl<W: Write>(records: &[RoundRecord], out: &mut W) -> std::io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    out.flush()
}
