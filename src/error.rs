//! Error types for directory mirroring
//!
//! Configuration errors are raised once while building a [`crate::SyncConfig`].
//! Traversal and action errors are entry-scoped: the reconciliation engine
//! either logs them and moves on, or escalates the first one to
//! [`SyncError::Aborted`] when `stop_on_errors` is set.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring or running a mirror
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source root is missing, not a directory, or symlinked-through
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Destination root is missing or not a directory
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// One root contains the other
    #[error("Source {} and destination {} overlap", source_root.display(), destination_root.display())]
    OverlappingRoots {
        /// Resolved source root
        source_root: PathBuf,
        /// Resolved destination root
        destination_root: PathBuf,
    },

    /// Log sink could not be set up
    #[error("Invalid log target: {0}")]
    LogTarget(String),

    /// Invalid schedule or flag combination
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Traversal or mutation failure on a single entry
    #[error("File system error: {0}")]
    FileSystem(String),

    /// A copy primitive failed
    #[error("Copy operation failed: {0}")]
    CopyFailed(String),

    /// A common entry could not be compared with its counterpart
    #[error("Comparison failed: {0}")]
    CompareFailed(String),

    /// An entry failure escalated because `stop_on_errors` is set
    #[error("Stopped on error at {}: {message}", path.display())]
    Aborted {
        /// Entry the failure happened on
        path: PathBuf,
        /// Underlying failure
        message: String,
    },
}

impl SyncError {
    /// Build a [`SyncError::FileSystem`] from an I/O error on `path`
    #[must_use]
    pub fn io(action: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::FileSystem(format!("Failed to {action} {}: {err}", path.display()))
    }

    /// Whether this error ends the pass (and the process) rather than a single entry
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SyncError>;
