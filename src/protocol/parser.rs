//! Command parser.
//!
//! Parses incoming protocol lines from raw text into structured `Command`
//! variants that the main loop can dispatch on.

use thiserror::Error;

/// Errors produced while parsing a command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("malformed {command}: expected '{usage}'")]
    Malformed {
        command: &'static str,
        usage: &'static str,
    },

    #[error("invalid {command} argument '{value}'")]
    InvalidArgument { command: &'static str, value: String },
}

/// A parsed presentation-to-engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Protocol handshake.
    Hello,

    /// Synchronization ping; replies `readyok` once scoring has settled.
    IsReady,

    /// Set an engine option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Start a new round, keeping the win tally.
    NewRound,

    /// Configure the target score. The raw text is kept so invalid input can
    /// fall back to the default.
    Target { raw: Option<String> },

    /// Throw, re-roll, or tie-breaker roll.
    Throw,

    /// Toggle the hold on a human die (0-based).
    Hold { index: usize },

    /// Bank the current turn.
    Score,

    /// Print the current snapshot.
    State,

    /// Terminate the engine process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, ProtocolError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = tokens.first() else {
        return Ok(None);
    };

    let cmd = match head {
        "hello" => Command::Hello,
        "isready" => Command::IsReady,
        "quit" => Command::Quit,
        "newround" => Command::NewRound,
        "throw" => Command::Throw,
        "score" => Command::Score,
        "state" => Command::State,

        "setoption" => parse_setoption(&tokens)?,
        "target" => parse_target(&tokens),
        "hold" => parse_hold(&tokens)?,

        other => return Err(ProtocolError::UnknownCommand(other.to_string())),
    };
    Ok(Some(cmd))
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Result<Command, ProtocolError> {
    const MALFORMED: ProtocolError = ProtocolError::Malformed {
        command: "setoption",
        usage: "setoption name <id> [value <x>]",
    };
    if tokens.len() < 3 || tokens[1] != "name" {
        return Err(MALFORMED);
    }

    let value_idx = tokens.iter().position(|&t| t == "value");
    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                return Err(MALFORMED);
            }
            let value = (!value_parts.is_empty()).then(|| value_parts.join(" "));
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Ok(Command::SetOption { name, value })
}

/// Parses `target [<n>]`. Any argument is accepted here; validation happens
/// when the target is applied.
fn parse_target(tokens: &[&str]) -> Command {
    let raw = (tokens.len() > 1).then(|| tokens[1..].join(" "));
    Command::Target { raw }
}

/// Parses `hold <index>`.
fn parse_hold(tokens: &[&str]) -> Result<Command, ProtocolError> {
    let Some(arg) = tokens.get(1) else {
        return Err(ProtocolError::Malformed {
            command: "hold",
            usage: "hold <index>",
        });
    };
    arg.parse::<usize>()
        .map(|index| Command::Hold { index })
        .map_err(|_| ProtocolError::InvalidArgument {
            command: "hold",
            value: arg.to_string(),
        })
}
