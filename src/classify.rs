//! Filesystem entry classification
//!
//! Every decision the engine makes starts with sorting an entry into one of
//! four kinds. Sockets, FIFOs and device nodes are "irregular": the mirror
//! never copies, deletes or replaces them.

use crate::error::{Result, SyncError};
use std::fs::{FileType, Metadata};
use std::io::ErrorKind;
use std::path::Path;

/// Kind of a filesystem entry under the effective symlink mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (not dereferenced, or dangling)
    Symlink,
    /// Socket, FIFO, device node or anything else
    Irregular,
}

impl EntryKind {
    /// Map a file type to an entry kind
    #[must_use]
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Irregular
        }
    }

    /// Short label used in log lines
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Irregular => "irregular entry",
        }
    }
}

/// Classify `path`
///
/// With `follow_symlinks` a symlink is reported as the kind of its target; a
/// dangling symlink is still reported as [`EntryKind::Symlink`] so it can be
/// copied literally. Without it, symlinks are never dereferenced.
///
/// # Errors
///
/// Returns an error if the entry's metadata cannot be read (permission denied,
/// entry vanished, symlink loop while following).
pub fn classify(path: &Path, follow_symlinks: bool) -> Result<EntryKind> {
    let link_meta =
        std::fs::symlink_metadata(path).map_err(|e| SyncError::io("inspect", path, &e))?;
    if !follow_symlinks || !link_meta.file_type().is_symlink() {
        return Ok(EntryKind::from_file_type(link_meta.file_type()));
    }

    match std::fs::metadata(path) {
        Ok(meta) => Ok(EntryKind::from_file_type(meta.file_type())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(EntryKind::Symlink),
        Err(e) => Err(SyncError::io("follow symlink", path, &e)),
    }
}

/// Metadata of `path` under the effective symlink mode
///
/// # Errors
///
/// Returns an error if the metadata cannot be read.
pub fn entry_metadata(path: &Path, follow_symlinks: bool) -> Result<Metadata> {
    let meta = if follow_symlinks {
        std::fs::metadata(path)
    } else {
        std::fs::symlink_metadata(path)
    };
    meta.map_err(|e| SyncError::io("read metadata of", path, &e))
}
