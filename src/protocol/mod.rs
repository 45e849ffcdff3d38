//! Text protocol handling.
//!
//! Line-oriented commands from the presentation layer and the response
//! lines the engine writes back.

pub mod parser;
pub mod render;

pub use parser::{parse_command, Command, ProtocolError};
pub use render::{write_error, write_snapshot, SnapshotTag};
