//! Inode registry for cycle-safe traversal
//!
//! This module provides `InodeRegistry`, a per-pass map from filesystem
//! identity to the first path it was seen at:
//! - Every directory is registered before the engine descends into it
//! - A second sighting of the same identity (symlink loop, bind mount,
//!   hardlinked directory) is reported so the caller skips it
//! - The source root and all of its ancestors are pre-seeded, so a link back
//!   up the tree is caught on first encounter

use crate::classify::entry_metadata;
use crate::error::Result;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inode information used as a key for identity tracking
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InodeInfo {
    /// Device ID
    pub dev: u64,
    /// Inode number
    pub ino: u64,
}

impl InodeInfo {
    /// Identity of `path` under the effective symlink mode
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata of `path` cannot be read.
    pub fn of(path: &Path, follow_symlinks: bool) -> Result<Self> {
        let meta = entry_metadata(path, follow_symlinks)?;
        Ok(Self::from_metadata(&meta))
    }

    /// Identity from already fetched metadata
    #[must_use]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

/// Whether the symlink at `link` resolves to a directory containing it
///
/// Covers every ancestor up to the filesystem root, so a link back to the
/// source root or above it is caught as well. A link that cannot be resolved
/// (dangling, looping) points at no ancestor.
#[must_use]
pub fn resolves_to_ancestor(link: &Path) -> bool {
    let Ok(target) = InodeInfo::of(link, true) else {
        return false;
    };
    link.ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .filter_map(|ancestor| InodeInfo::of(ancestor, true).ok())
        .any(|identity| identity == target)
}

/// Identity → first observed path, scoped to one pass
#[derive(Debug, Default)]
pub struct InodeRegistry {
    seen: HashMap<InodeInfo, PathBuf>,
}

impl InodeRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with `source_root` and every ancestor of it
    ///
    /// Ancestors whose metadata cannot be read are left out.
    #[must_use]
    pub fn seeded(source_root: &Path) -> Self {
        let mut registry = Self::new();
        registry.reseed(source_root);
        registry
    }

    /// Forget everything and seed again from `source_root`
    pub fn reseed(&mut self, source_root: &Path) {
        self.seen.clear();
        for ancestor in source_root.ancestors() {
            match InodeInfo::of(ancestor, true) {
                Ok(identity) => {
                    self.seen
                        .entry(identity)
                        .or_insert_with(|| ancestor.to_path_buf());
                }
                Err(e) => debug!("Not seeding {}: {}", ancestor.display(), e),
            }
        }
        debug!(
            "Seeded inode registry with {} identities from {}",
            self.seen.len(),
            source_root.display()
        );
    }

    /// Record `identity` at `path`
    ///
    /// Returns `true` if the identity is new this pass. Returns `false` if it
    /// was already seen; the caller must skip the entry and not recurse.
    pub fn observe(&mut self, identity: InodeInfo, path: &Path) -> bool {
        match self.seen.entry(identity) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(path.to_path_buf());
                true
            }
        }
    }

    /// Path at which `identity` was first observed
    #[must_use]
    pub fn first_seen(&self, identity: InodeInfo) -> Option<&Path> {
        self.seen.get(&identity).map(PathBuf::as_path)
    }

    /// Number of identities registered
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
