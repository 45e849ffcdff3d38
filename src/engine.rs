//! Engine state management.
//!
//! Holds the table, engine options, and dispatches parsed protocol commands,
//! writing responses to the given output. Every intent is answered with a
//! `snapshot` line; validation failures are reported first as an `error` line
//! and then cleared.

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, Write};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dice::RngDice;
use crate::protocol::{write_error, write_snapshot, Command, SnapshotTag};
use crate::round::{Snapshot, ValidationError};
use crate::table::{roll_delay_from_ms, Table, TableConfig, DEFAULT_ROLL_DELAY_MS, MAX_ROLL_DELAY_MS};

/// Whether the main loop should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    table: Table,
    pub options: HashMap<String, String>,
}

impl Engine {
    /// Creates an engine with a fresh table awaiting target configuration.
    pub fn new(config: &TableConfig) -> Self {
        Engine::with_table(Table::from_config(config))
    }

    pub fn with_table(table: Table) -> Self {
        Engine {
            table,
            options: HashMap::new(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Sets an engine option. Unknown names are stored but have no effect.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        match (name.as_str(), value.as_deref()) {
            ("RollDelay", Some(v)) => match v.parse::<u64>() {
                Ok(ms) => {
                    self.table.set_roll_delay(roll_delay_from_ms(ms));
                    debug!(delay = ?self.table.roll_delay(), "roll delay set");
                }
                Err(_) => warn!(value = v, "invalid RollDelay"),
            },
            ("Seed", Some(v)) => match v.parse::<u64>() {
                Ok(seed) => {
                    self.table.replace_source(Box::new(RngDice::seeded(seed)));
                    debug!(seed, "die source reseeded");
                }
                Err(_) => warn!(value = v, "invalid Seed"),
            },
            _ => {}
        }
        self.options.insert(name, value.unwrap_or_default());
    }

    /// Handles the handshake: writes id, options, protocol_version, and hellook.
    pub fn handle_hello<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name dicegame")?;
        writeln!(
            out,
            "option name RollDelay type spin default {} min 0 max {}",
            DEFAULT_ROLL_DELAY_MS, MAX_ROLL_DELAY_MS
        )?;
        writeln!(out, "option name Seed type string default <empty>")?;
        writeln!(out, "protocol_version 1")?;
        writeln!(out, "hellook")?;
        out.flush()
    }

    /// Handles `isready`: waits for any in-flight scoring before replying.
    pub async fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.table.settle().await;
        writeln!(out, "readyok")?;
        out.flush()
    }

    /// Dispatches one command.
    pub async fn handle<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<Flow> {
        match cmd {
            Command::Hello => self.handle_hello(out)?,
            Command::IsReady => self.handle_isready(out).await?,
            Command::SetOption { name, value } => self.set_option(name, value),
            Command::NewRound => {
                self.table.start_new_round();
                self.respond(out, None)?;
            }
            Command::Target { raw } => {
                let target = self.table.configure_str(raw.as_deref().unwrap_or_default());
                info!(target_score = target, "target applied");
                self.respond(out, None)?;
            }
            Command::Throw => {
                let updates = self.table.subscribe();
                let result = self.table.throw_or_reroll();
                if self.table.is_scoring() {
                    let table = self.table.clone();
                    follow(updates, async move { table.settle().await }, out).await?;
                }
                self.respond(out, result.err())?;
            }
            Command::Hold { index } => {
                let result = self.table.toggle_hold(index);
                self.respond(out, result.err())?;
            }
            Command::Score => {
                let updates = self.table.subscribe();
                let table = self.table.clone();
                follow(updates, async move { table.score().await }, out).await?;
                self.respond(out, None)?;
            }
            Command::State => {
                write_snapshot(out, SnapshotTag::Snapshot, &self.table.snapshot())?;
                out.flush()?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Writes the current snapshot, preceded by `error` if the intent was rejected.
    /// The error is cleared once written.
    fn respond<W: Write>(&self, out: &mut W, rejected: Option<ValidationError>) -> io::Result<()> {
        if let Some(err) = rejected {
            write_error(out, err)?;
        }
        write_snapshot(out, SnapshotTag::Snapshot, &self.table.snapshot())?;
        if rejected.is_some() {
            self.table.take_error();
        }
        out.flush()
    }
}

/// Drives `scoring` to completion, writing a `rolling` line for every
/// intermediate computer re-roll seen on `updates`.
///
/// `updates` must be subscribed before the intent that starts scoring, so the
/// first re-roll is not missed when the scoring task runs on another thread.
async fn follow<W, F>(
    mut updates: watch::Receiver<Snapshot>,
    scoring: F,
    out: &mut W,
) -> io::Result<()>
where
    W: Write,
    F: Future,
{
    let mut open = true;
    tokio::pin!(scoring);
    loop {
        tokio::select! {
            _ = &mut scoring => return Ok(()),
            changed = updates.changed(), if open => match changed {
                Ok(()) => {
                    let snapshot = updates.borrow_and_update().clone();
                    if snapshot.computer_rolling {
                        write_snapshot(out, SnapshotTag::Rolling, &snapshot)?;
                        out.flush()?;
                    }
                }
                Err(_) => open = false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::round::RoundEngine;
    use std::time::Duration;

    fn engine(faces: &[u8]) -> Engine {
        let round = RoundEngine::with_source(ScriptedDice::new(faces).unwrap());
        Engine::with_table(Table::new(round, Duration::from_millis(500)))
    }

    async fn run(engine: &mut Engine, cmd: Command) -> String {
        let mut out = Vec::new();
        engine.handle(cmd, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn snapshot_json(output: &str) -> serde_json::Value {
        let line = output
            .lines()
            .rev()
            .find(|l| l.starts_with("snapshot "))
            .unwrap();
        serde_json::from_str(line.strip_prefix("snapshot ").unwrap()).unwrap()
    }

    #[test]
    fn new_engine_has_no_options() {
        let engine = engine(&[1]);
        assert!(engine.options.is_empty());
        assert_eq!(engine.table().roll_delay(), Duration::from_millis(500));
    }

    #[test]
    fn set_option_roll_delay() {
        let mut engine = engine(&[1]);
        engine.set_option("RollDelay".to_string(), Some("120".to_string()));
        assert_eq!(engine.table().roll_delay(), Duration::from_millis(120));
        engine.set_option("RollDelay".to_string(), Some("999999".to_string()));
        assert_eq!(engine.table().roll_delay(), Duration::from_millis(5000));
        engine.set_option("RollDelay".to_string(), Some("soon".to_string()));
        assert_eq!(engine.table().roll_delay(), Duration::from_millis(5000));
        assert_eq!(engine.options.get("RollDelay"), Some(&"soon".to_string()));
    }

    #[test]
    fn handle_hello_outputs_handshake() {
        let engine = engine(&[1]);
        let mut output = Vec::new();
        engine.handle_hello(&mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("id name dicegame"));
        assert!(output.contains("option name RollDelay"));
        assert!(output.contains("protocol_version 1"));
        assert_eq!(output.lines().last(), Some("hellook"));
    }

    #[tokio::test(start_paused = true)]
    async fn target_then_throw() {
        let mut engine = engine(&[2, 3]);
        let out = run(&mut engine, Command::Target { raw: Some("nope".into()) }).await;
        let snap = snapshot_json(&out);
        assert_eq!(snap["targetScore"], 101);
        assert_eq!(snap["phase"]["kind"], "inProgress");

        let out = run(&mut engine, Command::Throw).await;
        let snap = snapshot_json(&out);
        assert_eq!(snap["humanDice"], serde_json::json!([2, 3, 2, 3, 2]));
        assert_eq!(snap["computerDice"], serde_json::json!([3, 2, 3, 2, 3]));
        assert_eq!(snap["primaryActionLabel"], "Re-roll");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_reroll_reports_then_clears_error() {
        let mut engine = engine(&[4]);
        run(&mut engine, Command::Target { raw: None }).await;
        run(&mut engine, Command::Throw).await;

        let out = run(&mut engine, Command::Throw).await;
        assert!(out.starts_with("error Please select at least one die"));
        let snap = snapshot_json(&out);
        assert_eq!(
            snap["lastError"],
            "Please select at least one die to hold before re-rolling."
        );
        assert_eq!(engine.table().snapshot().last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn score_writes_rolling_lines() {
        let mut engine = engine(&[1]);
        run(&mut engine, Command::Target { raw: Some("101".into()) }).await;
        run(&mut engine, Command::Throw).await;

        let out = run(&mut engine, Command::Score).await;
        let rolling = out.lines().filter(|l| l.starts_with("rolling ")).count();
        assert_eq!(rolling, 2);
        let snap = snapshot_json(&out);
        assert_eq!(snap["humanScore"], 5);
        assert_eq!(snap["humanTurnCount"], 1);
        assert_eq!(snap["computerRolling"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn third_throw_scores_before_responding() {
        let mut engine = engine(&[5]);
        run(&mut engine, Command::Target { raw: None }).await;
        run(&mut engine, Command::Throw).await;
        run(&mut engine, Command::Hold { index: 1 }).await;
        run(&mut engine, Command::Throw).await;
        run(&mut engine, Command::Hold { index: 1 }).await;

        let out = run(&mut engine, Command::Throw).await;
        assert!(out.lines().any(|l| l.starts_with("rolling ")));
        let snap = snapshot_json(&out);
        assert_eq!(snap["humanScore"], 25);
        assert_eq!(snap["computerScore"], 25);
        assert_eq!(snap["humanRollCount"], 0);
        assert_eq!(snap["primaryActionLabel"], "Throw");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn third_throw_reports_every_computer_roll_across_threads() {
        let round = RoundEngine::with_source(ScriptedDice::new(&[5]).unwrap());
        let mut engine = Engine::with_table(Table::new(round, Duration::from_millis(50)));
        run(&mut engine, Command::Target { raw: None }).await;
        run(&mut engine, Command::Throw).await;
        run(&mut engine, Command::Hold { index: 0 }).await;
        run(&mut engine, Command::Throw).await;
        run(&mut engine, Command::Hold { index: 0 }).await;

        let out = run(&mut engine, Command::Throw).await;
        let rolls: Vec<serde_json::Value> = out
            .lines()
            .filter_map(|l| l.strip_prefix("rolling "))
            .map(|json| serde_json::from_str(json).unwrap())
            .collect();
        let counts: Vec<_> = rolls.iter().map(|s| s["computerRollCount"].clone()).collect();
        assert_eq!(counts, vec![serde_json::json!(2), serde_json::json!(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_stops_the_loop() {
        let mut engine = engine(&[1]);
        let mut out = Vec::new();
        let flow = engine.handle(Command::Quit, &mut out).await.unwrap();
        assert_eq!(flow, Flow::Quit);
        assert!(out.is_empty());
    }
}
