//! Mirror engine
//!
//! [`Synchronizer`] owns a validated [`SyncConfig`] and runs passes over it.
//!
//! # Module Organization
//!
//! - `context`: Per-pass state (inode registry, ignore set, counters, error policy)
//! - `reconcile`: Per-directory dispatch of copy/delete/replace actions
//! - `tree_copy`: Cycle-safe copying of source-only subtrees
//! - `mod`: Public API (this file)

mod context;
mod reconcile;
mod tree_copy;

pub use context::ReconcileAction;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::scheduler::{Clock, Scheduler, SystemClock};
use crate::stats::SyncStats;
use context::PassContext;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// One-way mirror from a source tree to a destination tree
#[derive(Debug, Clone)]
pub struct Synchronizer {
    config: SyncConfig,
}

impl Synchronizer {
    /// Create an engine for `config`
    ///
    /// The config is always validated again, since its public fields may
    /// have changed after an earlier [`SyncConfig::validated`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the roots do not satisfy the startup
    /// preconditions (see [`SyncConfig::validated`]).
    pub fn new(config: SyncConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a single pass with fresh per-pass state
    ///
    /// Entry failures are logged and counted in the returned stats unless
    /// `stop_on_errors` is set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Aborted`] when `stop_on_errors` is set and
    /// an entry failed; no entries after the failing one are processed.
    pub fn sync_once(&self) -> Result<SyncStats> {
        let source = self.config.source();
        let destination = self.config.destination();
        info!(
            "Starting pass: {} -> {}{}",
            source.display(),
            destination.display(),
            if self.config.dry_run { " (dry run)" } else { "" }
        );
        let started = Instant::now();

        let mut ctx = PassContext::new(&self.config);
        let result = run_pass(&mut ctx);
        if let Err(e) = &result {
            error!("Pass aborted after {:?}: {}", started.elapsed(), e);
        }
        result?;

        info!("Pass completed in {:?}: {}", started.elapsed(), ctx.stats);
        Ok(ctx.stats)
    }

    /// Run passes on the configured schedule until one-shot completion
    ///
    /// # Errors
    ///
    /// Returns the error of an aborted pass.
    pub fn run(&self) -> Result<()> {
        self.run_with(SystemClock, None)
    }

    /// Run passes with a custom clock and an optional cancellation flag
    ///
    /// The flag is checked before every pass.
    ///
    /// # Errors
    ///
    /// Returns the error of an aborted pass.
    pub fn run_with<C: Clock>(&self, clock: C, cancel: Option<Arc<AtomicBool>>) -> Result<()> {
        let mut scheduler = Scheduler::new(self.config.interval, self.config.one_shot, clock);
        if let Some(flag) = cancel {
            scheduler = scheduler.with_cancel_flag(flag);
        }
        scheduler.run(|| self.sync_once().map(|_| ()))
    }
}

fn run_pass(ctx: &mut PassContext<'_>) -> Result<()> {
    let config = ctx.config;
    let source = config.source();
    let compared = ctx.comparator.compare(source, config.destination());
    if let Some(diff) = ctx.isolate(source, compared)? {
        reconcile::sync_dirs(ctx, &diff)?;
    }
    Ok(())
}
