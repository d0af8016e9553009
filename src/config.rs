//! Mirror configuration
//!
//! [`SyncConfig`] is built once at startup and is immutable for the rest of
//! the process. The engine re-runs [`SyncConfig::validated`] on whatever it
//! is handed, so the roots are always absolute, resolved, existing,
//! non-overlapping directories. Any `with_*` builder clears the validated
//! mark.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default delay between two passes
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Settings for one source → destination mirror
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)] // Independent behaviour switches
pub struct SyncConfig {
    source: PathBuf,
    destination: PathBuf,
    /// Treat symlinks as the objects they point to
    pub follow_symlinks: bool,
    /// Log decisions without touching the destination
    pub dry_run: bool,
    /// Compare regular files byte by byte instead of by size and mtime
    pub compare_by_content: bool,
    /// Escalate the first entry failure into an aborted pass
    pub stop_on_errors: bool,
    /// Run a single pass instead of looping
    pub one_shot: bool,
    /// Delay between the starts of two consecutive passes
    pub interval: Duration,
    validated: bool,
}

impl SyncConfig {
    /// Create a config with default flags for the given roots
    ///
    /// Defaults: interval 600 s, follow symlinks, no dry run, shallow
    /// comparison, best-effort error policy, periodic mode.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            follow_symlinks: true,
            dry_run: false,
            compare_by_content: false,
            stop_on_errors: false,
            one_shot: false,
            interval: DEFAULT_INTERVAL,
            validated: false,
        }
    }

    #[must_use]
    pub const fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self.validated = false;
        self
    }

    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self.validated = false;
        self
    }

    #[must_use]
    pub const fn with_compare_by_content(mut self, by_content: bool) -> Self {
        self.compare_by_content = by_content;
        self.validated = false;
        self
    }

    #[must_use]
    pub const fn with_stop_on_errors(mut self, stop: bool) -> Self {
        self.stop_on_errors = stop;
        self.validated = false;
        self
    }

    #[must_use]
    pub const fn with_one_shot(mut self, one_shot: bool) -> Self {
        self.one_shot = one_shot;
        self.validated = false;
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.validated = false;
        self
    }

    /// Source root (resolved once validated)
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination root (resolved once validated)
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Whether [`SyncConfig::validated`] produced this config
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }

    /// Check the startup preconditions and resolve both roots
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the source or destination does not exist or is not a directory
    /// - the source is a symlink while symlinks are not followed
    /// - one root is the other or an ancestor of it
    /// - the interval is zero outside one-shot mode
    pub fn validated(mut self) -> Result<Self> {
        if self.interval.is_zero() && !self.one_shot {
            return Err(SyncError::Config(
                "interval must be greater than zero unless running one-shot".to_string(),
            ));
        }

        let source_meta = std::fs::symlink_metadata(&self.source).map_err(|e| {
            SyncError::InvalidSource(format!("{} does not exist: {e}", self.source.display()))
        })?;
        if source_meta.file_type().is_symlink() && !self.follow_symlinks {
            return Err(SyncError::InvalidSource(format!(
                "{} is a symlink and symlinks are not followed",
                self.source.display()
            )));
        }

        let source = resolve_dir(&self.source).map_err(SyncError::InvalidSource)?;
        let destination = resolve_dir(&self.destination).map_err(SyncError::InvalidDestination)?;

        if source.starts_with(&destination) || destination.starts_with(&source) {
            return Err(SyncError::OverlappingRoots {
                source_root: source,
                destination_root: destination,
            });
        }

        self.source = source;
        self.destination = destination;
        self.validated = true;
        Ok(self)
    }
}

fn resolve_dir(path: &Path) -> std::result::Result<PathBuf, String> {
    let resolved = std::fs::canonicalize(path)
        .map_err(|e| format!("{} cannot be resolved: {e}", path.display()))?;
    if !resolved.is_dir() {
        return Err(format!("{} is not a directory", path.display()));
    }
    Ok(resolved)
}
