//! Statistics tracking for mirror passes
//!
//! A pass runs on a single thread, so [`SyncStats`] is a plain set of
//! counters owned by the pass context. In dry-run mode the action counters
//! count planned actions.

use std::fmt;

/// Counters for one pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    /// Directory pairs compared
    pub dirs_compared: u64,
    /// Regular files copied
    pub files_copied: u64,
    /// Symlinks recreated
    pub symlinks_copied: u64,
    /// Subtrees copied in one bulk copy
    pub trees_bulk_copied: u64,
    /// Subtrees rebuilt entry by entry because a cycle was found below them
    pub trees_reconstructed: u64,
    /// Destination entries deleted
    pub deleted: u64,
    /// Destination entries replaced
    pub replaced: u64,
    /// Entries skipped as an already visited identity
    pub cycles_skipped: u64,
    /// Entries skipped as irregular
    pub irregular_skipped: u64,
    /// Replaces refused because the destination is irregular
    pub replaces_refused: u64,
    /// Entry failures
    pub errors: u64,
    /// Bytes written by file copies
    pub bytes_copied: u64,
}

impl SyncStats {
    /// Copies, deletions and replacements taken (or planned) this pass
    #[must_use]
    pub const fn total_actions(&self) -> u64 {
        self.files_copied
            + self.symlinks_copied
            + self.trees_bulk_copied
            + self.trees_reconstructed
            + self.deleted
            + self.replaced
    }

    /// Whether the pass left the destination untouched
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.total_actions() == 0
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dirs compared, {} files, {} symlinks, {} bulk trees, {} rebuilt trees, \
             {} deleted, {} replaced, {} bytes, {} cycles skipped, {} irregular skipped, {} errors",
            self.dirs_compared,
            self.files_copied,
            self.symlinks_copied,
            self.trees_bulk_copied,
            self.trees_reconstructed,
            self.deleted,
            self.replaced,
            self.bytes_copied,
            self.cycles_skipped,
            self.irregular_skipped,
            self.errors
        )
    }
}
