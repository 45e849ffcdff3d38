//! Self-play round generation CLI.
//!
//! Plays rounds of the stand-in human against the computer policy and
//! writes one JSON record per round.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use dicegame::logging;
use dicegame::round::DEFAULT_TARGET_SCORE;
use dicegame::selfplay::{self, SelfPlayConfig};

#[derive(Parser)]
#[command(name = "selfplay")]
#[command(about = "Simulate dice rounds against the computer policy")]
struct Args {
    /// Number of rounds to play
    #[arg(short = 'n', long, default_value_t = 100)]
    rounds: usize,

    /// Target score for every round
    #[arg(long, default_value_t = DEFAULT_TARGET_SCORE)]
    target: u32,

    /// Number of parallel threads
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Base seed; round i uses seed + i (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Tie-breaker turns allowed before a round is left unresolved
    #[arg(long, default_value_t = 50)]
    max_tie_breakers: u32,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress the summary and per-round logging
    #[arg(short, long)]
    quiet: bool,

    /// Log every finished round
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(if args.verbose { "debug" } else { "info" });

    let config = SelfPlayConfig {
        num_rounds: args.rounds,
        target_score: args.target,
        threads: args.threads,
        seed: args.seed,
        max_tie_breakers: args.max_tie_breakers,
        quiet: args.quiet,
    };
    if !config.quiet {
        info!(
            rounds = config.num_rounds,
            target_score = config.target_score,
            threads = config.threads,
            seed = ?config.seed,
            "starting self-play"
        );
    }

    let start = Instant::now();
    let records = selfplay::run_self_play(&config)?;
    let elapsed = start.elapsed();

    if !config.quiet {
        let summary = selfplay::summarize(&records);
        eprintln!(
            "Completed {} rounds in {:.2}s",
            records.len(),
            elapsed.as_secs_f64()
        );
        selfplay::write_summary(&summary, &mut io::stderr())?;
    }

    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&records, &mut writer)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !config.quiet {
                info!(rounds = records.len(), path = %path.display(), "records written");
            }
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&records, &mut writer).context("failed to write stdout")?;
            writer.flush()?;
        }
    }
    Ok(())
}
