//! Log sink setup
//!
//! Everything the engine reports goes through `tracing`. The binary installs
//! a subscriber that writes to stdout and, when configured, appends the same
//! records to a log file without colour codes.

use crate::error::{Result, SyncError};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Level selected by `-q` / `-v` flags
#[must_use]
pub const fn level_for(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Check that a log file can be created at `path`
///
/// # Errors
///
/// Returns [`SyncError::LogTarget`] if the parent directory does not exist
/// or `path` is a directory.
pub fn check_log_target(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(SyncError::LogTarget(format!(
            "{} is a directory",
            path.display()
        )));
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(SyncError::LogTarget(format!(
            "directory {} for log file does not exist",
            parent.display()
        )));
    }
    Ok(())
}

/// Install the global subscriber
///
/// Records at or above the level chosen by `verbose`/`quiet` go to stdout,
/// and to `log_file` when one is given.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = level_for(verbose, quiet);
    let file_layer = match log_file {
        Some(path) => {
            check_log_target(path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SyncError::LogTarget(format!("{}: {e}", path.display())))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(
            stdout_layer
                .and_then(file_layer)
                .with_filter(LevelFilter::from_level(level)),
        )
        .try_init()
        .map_err(|e| SyncError::LogTarget(format!("cannot install logger: {e}")))
}
