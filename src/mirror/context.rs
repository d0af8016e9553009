//! Per-pass state
//!
//! Groups everything a pass threads through the recursion: the config, the
//! comparator, the inode registry, the ignore set and the counters. A fresh
//! `PassContext` is built for every pass, so nothing leaks between passes.

use crate::classify::{classify, EntryKind};
use crate::compare::DirectoryComparator;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::inode_registry::{resolves_to_ancestor, InodeInfo, InodeRegistry};
use crate::stats::SyncStats;
use crate::symlink::SymlinkRewriter;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Decision taken for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction<'p> {
    /// Copy a source entry to the destination
    Copy {
        /// Source entry
        from: &'p Path,
        /// Destination path
        to: &'p Path,
    },
    /// Remove a destination entry
    Delete(&'p Path),
    /// Remove a destination entry and copy the source entry in its place
    Replace {
        /// Source entry
        from: &'p Path,
        /// Destination entry being replaced
        to: &'p Path,
    },
    /// Leave an already visited identity alone
    SkipCycle(&'p Path),
    /// Leave an irregular entry alone
    SkipIrregular(&'p Path),
}

impl fmt::Display for ReconcileAction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { from, to } => write!(f, "copy {} to {}", from.display(), to.display()),
            Self::Delete(path) => write!(f, "delete {}", path.display()),
            Self::Replace { from, to } => {
                write!(f, "replace {} with {}", to.display(), from.display())
            }
            Self::SkipCycle(path) => write!(f, "skip previously encountered {}", path.display()),
            Self::SkipIrregular(path) => write!(f, "skip irregular entry {}", path.display()),
        }
    }
}

/// State owned by a single pass
pub(crate) struct PassContext<'a> {
    pub config: &'a SyncConfig,
    pub comparator: DirectoryComparator,
    pub rewriter: SymlinkRewriter,
    pub registry: InodeRegistry,
    pub ignored: HashSet<PathBuf>,
    pub stats: SyncStats,
}

impl<'a> PassContext<'a> {
    pub fn new(config: &'a SyncConfig) -> Self {
        let rewriter = SymlinkRewriter::new(config.source(), config.destination());
        Self {
            config,
            comparator: DirectoryComparator::new(
                !config.compare_by_content,
                config.follow_symlinks,
                rewriter.clone(),
            ),
            rewriter,
            registry: InodeRegistry::seeded(config.source()),
            ignored: HashSet::new(),
            stats: SyncStats::default(),
        }
    }

    pub const fn dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub fn classify(&self, path: &Path) -> Result<EntryKind> {
        classify(path, self.config.follow_symlinks)
    }

    /// Log a decision, marking it as suppressed in dry-run mode
    pub fn announce(&self, action: ReconcileAction<'_>) {
        match action {
            ReconcileAction::SkipCycle(_) | ReconcileAction::SkipIrregular(_) => {
                warn!("Warning: {action}");
            }
            _ if self.dry_run() => info!("[dry-run] Would {action}"),
            _ => info!("Will {action}"),
        }
    }

    /// Register the directory at `path`; `false` means it was seen before
    ///
    /// A repeat sighting is logged and counted as a skipped cycle.
    pub fn observe_dir(&mut self, path: &Path) -> Result<bool> {
        let identity = InodeInfo::of(path, self.config.follow_symlinks)?;
        if self.registry.observe(identity, path) {
            return Ok(true);
        }
        self.announce(ReconcileAction::SkipCycle(path));
        if let Some(first) = self.registry.first_seen(identity) {
            warn!(
                "{} was previously encountered at {}",
                path.display(),
                first.display()
            );
        }
        self.stats.cycles_skipped += 1;
        Ok(false)
    }

    /// Skip a symlink that would be copied as a link back to an enclosing
    /// directory; `true` means it was skipped
    ///
    /// Only applies when symlinks are not followed. Followed links to
    /// directories go through [`PassContext::observe_dir`] instead.
    pub fn skip_ancestor_link(&mut self, link: &Path) -> bool {
        if self.config.follow_symlinks || !resolves_to_ancestor(link) {
            return false;
        }
        self.announce(ReconcileAction::SkipCycle(link));
        self.stats.cycles_skipped += 1;
        true
    }

    /// Add an irregular entry to the pass-wide ignore set
    pub fn ignore(&mut self, path: &Path) {
        if self.ignored.insert(path.to_path_buf()) {
            self.skip_irregular(path);
        }
    }

    pub fn skip_irregular(&mut self, path: &Path) {
        self.announce(ReconcileAction::SkipIrregular(path));
        self.stats.irregular_skipped += 1;
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.contains(path)
    }

    /// Apply the error policy to the outcome of one entry
    ///
    /// Successes pass through as `Some`. A failure is logged and counted;
    /// it becomes `None` under the best-effort policy, or
    /// [`SyncError::Aborted`] when `stop_on_errors` is set. An abort coming
    /// from deeper down is passed on untouched.
    pub fn isolate<T>(&mut self, path: &Path, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_abort() => Err(e),
            Err(e) => {
                self.stats.errors += 1;
                if self.config.stop_on_errors {
                    error!("Error: {e}; stopping because stop-on-errors is set");
                    Err(SyncError::Aborted {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })
                } else {
                    error!("Error: {e}; continuing with the next entry");
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use tempfile::TempDir;

    fn config(temp: &TempDir, stop: bool) -> SyncConfig {
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(src.join("child")).unwrap();
        std::fs::create_dir(&dst).unwrap();
        SyncConfig::new(src, dst)
            .with_stop_on_errors(stop)
            .validated()
            .unwrap()
    }

    #[test]
    fn test_isolate_continues_by_default() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let config = config(&temp, false);
        let mut ctx = PassContext::new(&config);

        let failed: Result<()> = Err(SyncError::FileSystem("boom".to_string()));
        assert_eq!(ctx.isolate(Path::new("/x"), failed).unwrap(), None);
        assert_eq!(ctx.isolate(Path::new("/y"), Ok(5)).unwrap(), Some(5));
        assert_eq!(ctx.stats.errors, 1);
    }

    #[test]
    fn test_isolate_aborts_when_stopping_on_errors() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let config = config(&temp, true);
        let mut ctx = PassContext::new(&config);

        let failed: Result<()> = Err(SyncError::FileSystem("boom".to_string()));
        let err = ctx.isolate(Path::new("/x"), failed).unwrap_err();
        assert!(err.is_abort());

        // An abort from below is forwarded without counting it twice
        let err = ctx.isolate::<()>(Path::new("/z"), Err(err)).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(ctx.stats.errors, 1);
    }

    #[test]
    fn test_observe_dir_rejects_root_and_repeats() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let config = config(&temp, false);
        let mut ctx = PassContext::new(&config);
        let child = config.source().join("child");

        assert!(!ctx.observe_dir(config.source()).unwrap());
        assert!(ctx.observe_dir(&child).unwrap());
        assert!(!ctx.observe_dir(&child).unwrap());
        assert_eq!(ctx.stats.cycles_skipped, 2);
    }

    #[test]
    fn test_skip_ancestor_link_only_without_follow() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let following = config(&temp, false);
        let link = following.source().join("child").join("up");
        std::os::unix::fs::symlink("..", &link).unwrap();

        let mut ctx = PassContext::new(&following);
        assert!(!ctx.skip_ancestor_link(&link));
        assert_eq!(ctx.stats.cycles_skipped, 0);

        let literal = following.clone().with_follow_symlinks(false).validated().unwrap();
        let mut ctx = PassContext::new(&literal);
        assert!(ctx.skip_ancestor_link(&link));
        assert_eq!(ctx.stats.cycles_skipped, 1);
    }

    #[test]
    fn test_ignore_counts_once() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let config = config(&temp, false);
        let mut ctx = PassContext::new(&config);

        ctx.ignore(Path::new("/src/fifo"));
        ctx.ignore(Path::new("/src/fifo"));
        assert!(ctx.is_ignored(Path::new("/src/fifo")));
        assert_eq!(ctx.stats.irregular_skipped, 1);
    }

    #[test]
    fn test_action_display() {
        let from = Path::new("/src/a");
        let to = Path::new("/dst/a");
        assert_eq!(
            ReconcileAction::Copy { from, to }.to_string(),
            "copy /src/a to /dst/a"
        );
        assert_eq!(ReconcileAction::Delete(to).to_string(), "delete /dst/a");
        assert_eq!(
            ReconcileAction::Replace { from, to }.to_string(),
            "replace /dst/a with /src/a"
        );
    }
}
