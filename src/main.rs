//! Dicegame -- a human-vs-computer dice game engine speaking a line protocol.
//!
//! This binary reads commands from stdin and writes responses to stdout.
//! Logs are written to stderr.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use dicegame::engine::{Engine, Flow};
use dicegame::logging;
use dicegame::protocol::{parse_command, write_error};
use dicegame::table::{roll_delay_from_ms, TableConfig, DEFAULT_ROLL_DELAY_MS};

#[derive(Parser)]
#[command(name = "dicegame")]
#[command(about = "Human-vs-computer dice game engine over stdin/stdout")]
struct Args {
    /// Pause after each computer re-roll, in milliseconds
    #[arg(long, default_value_t = DEFAULT_ROLL_DELAY_MS)]
    roll_delay_ms: u64,

    /// Seed for the dice (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Runs the main protocol loop, reading commands from stdin
/// and writing responses to stdout.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = TableConfig {
        roll_delay: roll_delay_from_ms(args.roll_delay_ms),
        seed: args.seed,
    };
    let mut engine = Engine::new(&config);

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let cmd = match parse_command(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(err) => {
                warn!(%err, line = line.as_str(), "skipping command");
                write_error(&mut out, &err)?;
                out.flush()?;
                continue;
            }
        };

        if engine.handle(cmd, &mut out).await? == Flow::Quit {
            break;
        }
    }

    engine.table().settle().await;
    out.flush()?;
    Ok(())
}
