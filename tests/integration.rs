//! Integration tests for the dicegame engine binary.
//!
//! Tests the full protocol session flow by spawning the engine process,
//! sending commands via stdin, and verifying stdout responses.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

use serde_json::Value;

/// Sends a sequence of commands to the engine and collects stdout lines.
fn run_engine_with(args: &[&str], commands: &[&str]) -> Vec<String> {
    let exe = env!("CARGO_BIN_EXE_dicegame");
    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start dicegame");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for cmd in commands {
        writeln!(stdin, "{}", cmd).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

fn run_engine(commands: &[&str]) -> Vec<String> {
    run_engine_with(&["--roll-delay-ms", "0", "--seed", "42"], commands)
}

fn snapshots(lines: &[String]) -> Vec<Value> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("snapshot "))
        .map(|json| serde_json::from_str(json).expect("snapshot should be valid JSON"))
        .collect()
}

fn dice_sum(value: &Value) -> u64 {
    value
        .as_array()
        .expect("dice should be an array")
        .iter()
        .map(|d| d.as_u64().unwrap())
        .sum()
}

#[test]
fn hello_handshake_with_protocol_version() {
    let lines = run_engine(&["hello", "quit"]);

    assert!(lines.iter().any(|l| l == "id name dicegame"));
    assert!(lines.iter().any(|l| l == "protocol_version 1"));
    assert_eq!(lines.last().map(String::as_str), Some("hellook"));

    for opt in lines.iter().filter(|l| l.starts_with("option ")) {
        assert!(opt.contains("type "), "option line missing type: {}", opt);
    }
}

#[test]
fn isready_response() {
    let lines = run_engine(&["isready", "quit"]);
    assert_eq!(lines, vec!["readyok"]);
}

#[test]
fn unknown_commands_report_errors() {
    let lines = run_engine(&["roll the dice", "hold", "isready", "quit"]);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("error unknown command"));
    assert!(lines[1].starts_with("error malformed hold"));
    assert_eq!(lines[2], "readyok");
}

#[test]
fn initial_state_awaits_target() {
    let lines = run_engine(&["state", "quit"]);
    let snap = &snapshots(&lines)[0];
    assert_eq!(snap["phase"]["kind"], "awaitingTargetConfig");
    assert_eq!(snap["primaryActionLabel"], "Throw");
    assert_eq!(snap["primaryActionEnabled"], false);
    assert_eq!(snap["humanDice"], Value::Null);
    assert_eq!(snap["scoreEnabled"], false);
}

#[test]
fn invalid_target_falls_back_to_default() {
    let lines = run_engine(&["target -5", "quit"]);
    let snap = &snapshots(&lines)[0];
    assert_eq!(snap["targetScore"], 101);
    assert_eq!(snap["phase"]["kind"], "inProgress");
}

#[test]
fn throw_deals_both_hands() {
    let lines = run_engine(&["target 150", "throw", "quit"]);
    let snaps = snapshots(&lines);
    let snap = snaps.last().unwrap();

    assert_eq!(snap["targetScore"], 150);
    assert_eq!(snap["humanDice"].as_array().unwrap().len(), 5);
    assert_eq!(snap["computerDice"].as_array().unwrap().len(), 5);
    assert_eq!(snap["humanRollCount"], 1);
    assert_eq!(snap["primaryActionLabel"], "Re-roll");
    assert_eq!(snap["diceInteractive"], true);
    assert_eq!(snap["scoreEnabled"], true);
}

#[test]
fn reroll_without_hold_is_rejected() {
    let lines = run_engine(&["target", "throw", "throw", "state", "quit"]);
    let error = lines
        .iter()
        .position(|l| l.starts_with("error "))
        .expect("expected an error line");
    assert_eq!(
        lines[error],
        "error Please select at least one die to hold before re-rolling."
    );
    let after: Value =
        serde_json::from_str(lines[error + 1].strip_prefix("snapshot ").unwrap()).unwrap();
    assert_eq!(after["humanRollCount"], 1);

    // The message is shown once.
    let state = snapshots(&lines).pop().unwrap();
    assert_eq!(state["lastError"], Value::Null);
}

#[test]
fn fifth_hold_is_rejected() {
    let lines = run_engine(&[
        "target", "throw", "hold 0", "hold 1", "hold 2", "hold 3", "hold 4", "quit",
    ]);
    assert!(lines
        .iter()
        .any(|l| l == "error Maximum of 4 dice can be selected."));
    let snap = snapshots(&lines).pop().unwrap();
    assert_eq!(snap["heldIndices"], serde_json::json!([0, 1, 2, 3]));
}

#[test]
fn score_banks_dice_sums() {
    let lines = run_engine(&["target", "throw", "score", "quit"]);
    let snaps = snapshots(&lines);
    let thrown = &snaps[1];
    let scored = &snaps[2];

    assert_eq!(scored["humanScore"].as_u64().unwrap(), dice_sum(&thrown["humanDice"]));
    assert_eq!(scored["humanTurnCount"], 1);
    assert_eq!(scored["computerTurnCount"], 1);
    assert_eq!(scored["humanRollCount"], 0);
    assert_eq!(scored["computerRolling"], false);
    assert_eq!(scored["primaryActionLabel"], "Throw");

    // The computer's dice as last shown are what it banked.
    assert_eq!(
        scored["computerScore"].as_u64().unwrap(),
        dice_sum(&scored["computerDice"])
    );
}

#[test]
fn seeded_sessions_are_reproducible() {
    let commands = ["target 30", "throw", "hold 0", "throw", "score", "throw", "score", "quit"];
    // Rolling lines depend on scheduling; final snapshots do not.
    let a = snapshots(&run_engine(&commands));
    let b = snapshots(&run_engine(&commands));
    assert_eq!(a.len(), 7);
    assert_eq!(a, b);
}

#[test]
fn session_plays_to_a_conclusion() {
    let mut commands = vec!["target 20"];
    for _ in 0..12 {
        commands.extend(["throw", "score"]);
    }
    commands.push("quit");
    let lines = run_engine(&commands);

    // Seed 42 deals the human 1 2 2 5 4; the computer re-rolls its 1 twice
    // and banks 21, ending the round on the first turn.
    let snaps = snapshots(&lines);
    let first_score = &snaps[2];
    assert_eq!(first_score["humanDice"], serde_json::json!([1, 2, 2, 5, 4]));
    assert_eq!(first_score["computerDice"], serde_json::json!([4, 5, 1, 6, 5]));

    let last = snaps.last().unwrap();
    assert_eq!(last["phase"]["kind"], "concluded");
    assert_eq!(last["phase"]["winner"], "computer");
    assert_eq!(last["outcome"], "You Lose!");
    assert_eq!(last["humanScore"], 14);
    assert_eq!(last["computerScore"], 21);
    assert_eq!(last["humanTurnCount"], 1);
    assert_eq!(last["humanWins"], 0);
    assert_eq!(last["computerWins"], 1);
    assert_eq!(last["primaryActionEnabled"], false);

    // Later throws and scores leave the concluded round untouched.
    assert!(snaps[2..].iter().all(|s| s == first_score));
}

#[test]
fn rolling_lines_shown_when_paced() {
    let lines = run_engine_with(
        &["--roll-delay-ms", "20", "--seed", "7"],
        &["target", "throw", "score", "quit"],
    );
    let score_snapshot = lines
        .iter()
        .rposition(|l| l.starts_with("snapshot "))
        .unwrap();
    let rolling: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with("rolling "))
        .map(|(i, _)| i)
        .collect();
    assert!(!rolling.is_empty(), "expected rolling lines");
    assert!(rolling.iter().all(|&i| i < score_snapshot));
    for i in rolling {
        let snap: Value = serde_json::from_str(lines[i].strip_prefix("rolling ").unwrap()).unwrap();
        assert_eq!(snap["computerRolling"], true);
        assert_eq!(snap["diceInteractive"], false);
    }
}

#[test]
fn newround_keeps_tally_and_resets_scores() {
    let mut commands = vec!["target 20"];
    for _ in 0..12 {
        commands.extend(["throw", "score"]);
    }
    commands.extend(["newround", "quit"]);
    let lines = run_engine(&commands);

    let snap = snapshots(&lines).pop().unwrap();
    assert_eq!(snap["phase"]["kind"], "awaitingTargetConfig");
    assert_eq!(snap["computerWins"], 1);
    assert_eq!(snap["humanScore"], 0);
    assert_eq!(snap["computerScore"], 0);
    assert_eq!(snap["humanDice"], Value::Null);
}
