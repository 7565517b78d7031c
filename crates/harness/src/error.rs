//! Error taxonomy for harness operations.
//!
//! Snapshot mismatches are deliberately not errors: `compare` returns a
//! [`Comparison`](crate::snapshot::Comparison) so callers can render the
//! diff themselves before failing the test.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: nix::errno::Errno,
    },

    #[error("operation on a closed session")]
    ClosedSession,

    #[error("text not found within {timeout:?}: {pattern}")]
    TextNotFound { pattern: String, timeout: Duration },

    #[error("no baseline recorded for '{key}' (run in update mode to create it)")]
    MissingBaseline { key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PTY error: {0}")]
    Nix(#[from] nix::errno::Errno),
}

pub type Result<T> = std::result::Result<T, Error>;
