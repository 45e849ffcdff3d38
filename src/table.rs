//! Async driver for a round.
//!
//! `Table` shares one `RoundEngine` between the presentation layer and the
//! scoring task. The engine lock is never held across an await: every intent
//! takes the lock, applies one transition, copies a `Snapshot`, and releases
//! it before publishing the snapshot on a watch channel. The computer's
//! re-rolls are paced with `tokio::time::sleep` so each one is observable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dice::{DieSource, RngDice};
use crate::round::{HoldChange, RoundEngine, Snapshot, ThrowOutcome, TurnResult, ValidationError};

/// Pause after each computer re-roll.
pub const DEFAULT_ROLL_DELAY_MS: u64 = 500;

/// Longest pause accepted through configuration.
pub const MAX_ROLL_DELAY_MS: u64 = 5000;

/// Settings for a new table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub roll_delay: Duration,
    /// Fixed seed for the die source; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            roll_delay: Duration::from_millis(DEFAULT_ROLL_DELAY_MS),
            seed: None,
        }
    }
}

/// Clamps a configured delay in milliseconds to the accepted range.
pub fn roll_delay_from_ms(ms: u64) -> Duration {
    Duration::from_millis(ms.min(MAX_ROLL_DELAY_MS))
}

/// Shared handle to a round. Clones refer to the same round.
#[derive(Clone)]
pub struct Table {
    engine: Arc<Mutex<RoundEngine>>,
    roll_delay: Duration,
    updates: Arc<watch::Sender<Snapshot>>,
    pending: Arc<Mutex<Option<JoinHandle<Option<TurnResult>>>>>,
}

impl Table {
    pub fn new(engine: RoundEngine, roll_delay: Duration) -> Self {
        let (updates, _) = watch::channel(engine.snapshot());
        Table {
            engine: Arc::new(Mutex::new(engine)),
            roll_delay,
            updates: Arc::new(updates),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Builds a table with a random die source.
    pub fn from_config(config: &TableConfig) -> Self {
        let source = RngDice::from_seed_option(config.seed);
        Table::new(RoundEngine::with_source(source), config.roll_delay)
    }

    pub fn roll_delay(&self) -> Duration {
        self.roll_delay
    }

    /// Applies to scoring sequences started after the call.
    pub fn set_roll_delay(&mut self, delay: Duration) {
        self.roll_delay = delay;
    }

    /// Receives a snapshot after every transition, including each computer re-roll.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    pub fn is_scoring(&self) -> bool {
        self.lock().is_scoring()
    }

    pub fn configure(&self, target: i64) -> u32 {
        self.apply(|engine| engine.configure(target))
    }

    pub fn configure_str(&self, raw: &str) -> u32 {
        self.apply(|engine| engine.configure_str(raw))
    }

    pub fn toggle_hold(&self, index: usize) -> Result<HoldChange, ValidationError> {
        self.apply(|engine| engine.toggle_hold(index))
    }

    pub fn start_new_round(&self) -> bool {
        self.apply(RoundEngine::start_new_round)
    }

    /// Clears the one-shot validation error after the caller has shown it.
    pub fn take_error(&self) -> Option<ValidationError> {
        self.apply(RoundEngine::take_error)
    }

    pub fn replace_source(&self, source: Box<dyn DieSource>) {
        self.lock().replace_source(source);
    }

    /// Throw or re-roll. On the third human roll the scoring sequence is
    /// spawned onto the current runtime; use [`settle`](Self::settle) to wait
    /// for it. Outside a runtime the turn is scored before returning, unpaced.
    pub fn throw_or_reroll(&self) -> Result<ThrowOutcome, ValidationError> {
        let outcome = self.apply(RoundEngine::throw_or_reroll);
        if let Ok(ThrowOutcome::ScoringStarted) = outcome {
            match Handle::try_current() {
                Ok(runtime) => {
                    debug!("third roll, scoring automatically");
                    let table = self.clone();
                    let handle = runtime.spawn(async move { table.drive_scoring().await });
                    *self.lock_pending() = Some(handle);
                }
                Err(_) => {
                    debug!("third roll outside a runtime, scoring inline");
                    self.apply(RoundEngine::complete_scoring);
                }
            }
        }
        outcome
    }

    /// Runs the full scoring sequence. Returns `None` without side effects if
    /// there is nothing to score or another scoring sequence is in flight.
    pub async fn score(&self) -> Option<TurnResult> {
        if !self.apply(RoundEngine::begin_scoring) {
            return None;
        }
        self.drive_scoring().await
    }

    /// Waits for an automatically started scoring sequence, if any.
    pub async fn settle(&self) -> Option<TurnResult> {
        let handle = self.lock_pending().take()?;
        match handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!(%err, "scoring task failed");
                None
            }
        }
    }

    async fn drive_scoring(&self) -> Option<TurnResult> {
        while self.apply(RoundEngine::computer_step) {
            tokio::time::sleep(self.roll_delay).await;
        }
        self.apply(RoundEngine::finish_scoring)
    }

    fn apply<T>(&self, transition: impl FnOnce(&mut RoundEngine) -> T) -> T {
        let (out, snapshot) = {
            let mut engine = self.lock();
            let out = transition(&mut *engine);
            (out, engine.snapshot())
        };
        self.updates.send_replace(snapshot);
        out
    }

    fn lock(&self) -> MutexGuard<'_, RoundEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<Option<TurnResult>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
