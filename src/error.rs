//! Error types for memory map inspection.
//!
//! Every fatal condition of an inspection request surfaces as one
//! [`VmmapError`] carrying a human-readable cause. Recoverable conditions
//! (a missing detailed source) never reach this type; see
//! [`crate::process::memory::SourceAttempt`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmmapError {
    /// Neither memory-map source of the target could be opened.
    #[error("vmmap cannot examine process {pid} because it no longer appears to be running.")]
    ProcessUnavailable { pid: u32 },

    /// The target exists but its memory-map sources are not readable for us.
    #[error(
        "vmmap cannot examine process {pid} because you do not have appropriate privileges to examine it; try running with `sudo`."
    )]
    InsufficientPrivilege { pid: u32 },

    /// A size attribute carried a number or unit we cannot interpret.
    #[error("Failed to parse size: {0}")]
    MalformedSize(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VmmapError>;
