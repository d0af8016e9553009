//! Symlink target rewriting
//!
//! An absolute link that points inside the source tree would dangle (or worse,
//! point back into the source) once copied. Such targets are re-rooted under
//! the destination; everything else is copied literally.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};

/// Target to give a copied symlink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Absolute source-internal target moved under the destination root
    Rewritten(PathBuf),
    /// Relative or external target, kept as is
    Preserved(PathBuf),
}

impl LinkTarget {
    /// The path the new link should point to
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Rewritten(path) | Self::Preserved(path) => path,
        }
    }
}

/// Rewrites link targets from the source root to the destination root
#[derive(Debug, Clone)]
pub struct SymlinkRewriter {
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl SymlinkRewriter {
    #[must_use]
    pub fn new(source_root: &Path, dest_root: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            dest_root: dest_root.to_path_buf(),
        }
    }

    /// Decide the target for a copy of `source_link`
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be read.
    pub fn resolve_copy_target(&self, source_link: &Path) -> Result<LinkTarget> {
        let raw = std::fs::read_link(source_link)
            .map_err(|e| SyncError::io("read symlink", source_link, &e))?;
        Ok(self.rewrite(raw))
    }

    /// Rewrite an already read raw target
    #[must_use]
    pub fn rewrite(&self, raw: PathBuf) -> LinkTarget {
        if raw.is_absolute() {
            if let Ok(rest) = raw.strip_prefix(&self.source_root) {
                return LinkTarget::Rewritten(self.dest_root.join(rest));
            }
        }
        LinkTarget::Preserved(raw)
    }
}
