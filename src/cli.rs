//! Command-line interface definitions
//!
//! This module organizes CLI arguments by **functional usage** - each group
//! contains the options needed by a specific component or subsystem.

use crate::config::SyncConfig;
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Periodically mirror a source directory into a destination directory
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source and destination paths
    #[command(flatten)]
    pub paths: PathConfig,

    /// Pass behaviour (comparison, symlinks, error policy)
    #[command(flatten)]
    pub sync: SyncOptions,

    /// Pass cadence
    #[command(flatten)]
    pub schedule: ScheduleConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

// ============================================================================
// FUNCTIONAL GROUPS: Organized by what component consumes them
// ============================================================================

/// Paths configuration
///
/// Used by: `SyncConfig::validated()`, `Synchronizer`
#[derive(clap::Args, Debug, Clone)]
pub struct PathConfig {
    /// Directory to mirror from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory to mirror into (entries missing from SOURCE are deleted)
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,
}

/// Per-pass behaviour
///
/// Used by: `DirectoryComparator`, `PassContext`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Sync Options")]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncOptions {
    /// Copy symlinks as links instead of the objects they point to
    #[arg(long)]
    pub do_not_follow_symlinks: bool,

    /// Log what would change without touching the destination
    #[arg(long)]
    pub dry_run: bool,

    /// Compare files byte by byte instead of by size and modification time
    #[arg(long)]
    pub by_content: bool,

    /// Abort the pass and exit non-zero on the first failing entry
    ///
    /// By default a failing entry is logged and the pass moves on; the entry
    /// is retried on the next pass.
    #[arg(long)]
    pub stop_on_errors: bool,
}

/// Scheduling configuration
///
/// Used by: `Scheduler`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Schedule Options")]
pub struct ScheduleConfig {
    /// Seconds between the starts of two consecutive passes
    #[arg(long, value_name = "SECONDS", default_value = "600")]
    pub interval: u64,

    /// Run a single pass and exit
    #[arg(long)]
    pub one_shot: bool,
}

/// Output and logging configuration
///
/// Used by: `main()`, `logging::init()`
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Also append log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbose output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

// ============================================================================
// IMPLEMENTATION: Convenience methods and validation
// ============================================================================

impl Args {
    /// Validate command-line arguments
    ///
    /// Checks that depend on the filesystem state of the roots are left to
    /// [`SyncConfig::validated`].
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Both --quiet and --verbose options are used
    /// - The interval is zero without --one-shot
    /// - The log file's parent directory does not exist
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        if self.schedule.interval == 0 && !self.schedule.one_shot {
            anyhow::bail!("Interval must be greater than 0 unless --one-shot is given");
        }

        if let Some(log_file) = &self.output.log_file {
            crate::logging::check_log_target(log_file)?;
        }

        Ok(())
    }

    /// Build the (unvalidated) engine configuration
    #[must_use]
    pub fn to_config(&self) -> SyncConfig {
        SyncConfig::new(&self.paths.source, &self.paths.destination)
            .with_follow_symlinks(!self.sync.do_not_follow_symlinks)
            .with_dry_run(self.sync.dry_run)
            .with_compare_by_content(self.sync.by_content)
            .with_stop_on_errors(self.sync.stop_on_errors)
            .with_one_shot(self.schedule.one_shot)
            .with_interval(Duration::from_secs(self.schedule.interval))
    }

    /// Whether the log file would be inside `destination`, where a pass
    /// deletes it
    #[must_use]
    pub fn log_file_inside(&self, destination: &Path) -> bool {
        let Some(log_file) = self.output.log_file.as_deref() else {
            return false;
        };
        let parent = match log_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match (std::fs::canonicalize(parent), log_file.file_name()) {
            (Ok(parent), Some(name)) => parent.join(name).starts_with(destination),
            _ => log_file.starts_with(destination),
        }
    }

    // ========== Convenience accessors for commonly used fields ==========

    #[must_use]
    pub const fn source(&self) -> &PathBuf {
        &self.paths.source
    }

    #[must_use]
    pub const fn destination(&self) -> &PathBuf {
        &self.paths.destination
    }

    #[must_use]
    pub const fn verbose(&self) -> u8 {
        self.output.verbose
    }

    #[must_use]
    pub const fn quiet(&self) -> bool {
        self.output.quiet
    }
}
