//! Response lines.
//!
//! Snapshots are written as `<tag> <json>` on a single line so a reader can
//! split on the first space.

use std::io::{self, Write};

use crate::round::Snapshot;

/// Prefix for a snapshot line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTag {
    /// State after a command completed.
    Snapshot,
    /// Intermediate state while the computer is re-rolling.
    Rolling,
}

impl SnapshotTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            SnapshotTag::Snapshot => "snapshot",
            SnapshotTag::Rolling => "rolling",
        }
    }
}

/// Writes `<tag> <json>`.
pub fn write_snapshot<W: Write>(out: &mut W, tag: SnapshotTag, snapshot: &Snapshot) -> io::Result<()> {
    write!(out, "{} ", tag.as_str())?;
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)
}

/// Writes `error <message>`.
pub fn write_error<W: Write>(out: &mut W, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "error {}", message)
}
