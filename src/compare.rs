//! Directory comparison
//!
//! [`DirectoryComparator::compare`] diffs the immediate entries of one
//! directory pair. Common subdirectories are only named in the result; their
//! own diff is produced when the engine descends into them, after the cycle
//! guard has accepted the subdirectory.

use crate::classify::{classify, entry_metadata, EntryKind};
use crate::error::{Result, SyncError};
use crate::symlink::SymlinkRewriter;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read buffer size for content comparison
const BUFFER_SIZE: usize = 64 * 1024;

/// Differences between one source directory and its destination counterpart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryDiff {
    /// Source directory of the pair
    pub source_dir: PathBuf,
    /// Destination directory of the pair
    pub dest_dir: PathBuf,
    /// Names only in the source
    pub source_only: BTreeSet<OsString>,
    /// Names only in the destination
    pub dest_only: BTreeSet<OsString>,
    /// Names that are directories on both sides
    pub common_dirs: BTreeSet<OsString>,
    /// Common files (or symlinks) whose metadata, content or target differ
    pub diff_files: BTreeSet<OsString>,
    /// Common names with mismatched kinds or an irregular side
    pub common_irregular: BTreeSet<OsString>,
    /// Common names that could not be compared, with the failure message
    ///
    /// Nothing may be done to these names this pass.
    pub failed: BTreeMap<OsString, String>,
}

impl DirectoryDiff {
    /// Every comparable name that needs looking at, from either side
    pub fn names(&self) -> impl Iterator<Item = &OsString> {
        self.source_only
            .iter()
            .chain(&self.dest_only)
            .chain(&self.common_dirs)
            .chain(&self.diff_files)
            .chain(&self.common_irregular)
    }

    /// Whether nothing at this level needs an action
    ///
    /// Common directories are not counted: they may still differ below.
    #[must_use]
    pub fn is_level_clean(&self) -> bool {
        self.source_only.is_empty()
            && self.dest_only.is_empty()
            && self.diff_files.is_empty()
            && self.common_irregular.is_empty()
            && self.failed.is_empty()
    }
}

/// Outcome of comparing one common name
enum PairKind {
    Dirs,
    Same,
    Differ,
    Mismatch,
}

/// Produces [`DirectoryDiff`]s under one comparison mode
#[derive(Debug, Clone)]
pub struct DirectoryComparator {
    /// Decide file equality by size and mtime only
    pub shallow: bool,
    /// Dereference symlinks while comparing
    pub follow_symlinks: bool,
    rewriter: SymlinkRewriter,
}

impl DirectoryComparator {
    #[must_use]
    pub fn new(shallow: bool, follow_symlinks: bool, rewriter: SymlinkRewriter) -> Self {
        Self {
            shallow,
            follow_symlinks,
            rewriter,
        }
    }

    /// Compare the immediate entries of `source_dir` and `dest_dir`
    ///
    /// A common name that cannot be classified or read on either side is
    /// filed under `failed` so one unreadable entry does not hide the rest of
    /// the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be listed.
    pub fn compare(&self, source_dir: &Path, dest_dir: &Path) -> Result<DirectoryDiff> {
        let source_names = list_names(source_dir)?;
        let dest_names = list_names(dest_dir)?;

        let mut diff = DirectoryDiff {
            source_dir: source_dir.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
            source_only: source_names.difference(&dest_names).cloned().collect(),
            dest_only: dest_names.difference(&source_names).cloned().collect(),
            ..DirectoryDiff::default()
        };

        for name in source_names.intersection(&dest_names) {
            let src = source_dir.join(name);
            let dst = dest_dir.join(name);
            let bucket = match self.classify_pair(&src, &dst) {
                Ok(PairKind::Dirs) => &mut diff.common_dirs,
                Ok(PairKind::Same) => continue,
                Ok(PairKind::Differ) => &mut diff.diff_files,
                Ok(PairKind::Mismatch) => &mut diff.common_irregular,
                Err(e) => {
                    diff.failed.insert(name.clone(), e.to_string());
                    continue;
                }
            };
            bucket.insert(name.clone());
        }

        debug!(
            "Compared {} with {}: {} source-only, {} dest-only, {} dirs, {} differing, {} irregular, {} failed",
            source_dir.display(),
            dest_dir.display(),
            diff.source_only.len(),
            diff.dest_only.len(),
            diff.common_dirs.len(),
            diff.diff_files.len(),
            diff.common_irregular.len(),
            diff.failed.len()
        );
        Ok(diff)
    }

    fn classify_pair(&self, src: &Path, dst: &Path) -> Result<PairKind> {
        let kinds = (
            classify(src, self.follow_symlinks)?,
            classify(dst, self.follow_symlinks)?,
        );
        let equal = match kinds {
            (EntryKind::Directory, EntryKind::Directory) => return Ok(PairKind::Dirs),
            (EntryKind::File, EntryKind::File) => self.files_equal(src, dst)?,
            (EntryKind::Symlink, EntryKind::Symlink) => self.links_equal(src, dst)?,
            _ => return Ok(PairKind::Mismatch),
        };
        Ok(if equal { PairKind::Same } else { PairKind::Differ })
    }

    fn files_equal(&self, src: &Path, dst: &Path) -> Result<bool> {
        let src_meta = entry_metadata(src, self.follow_symlinks)?;
        let dst_meta = entry_metadata(dst, self.follow_symlinks)?;
        if src_meta.len() != dst_meta.len() {
            return Ok(false);
        }
        if self.shallow {
            let src_mtime = src_meta
                .modified()
                .map_err(|e| SyncError::io("read mtime of", src, &e))?;
            let dst_mtime = dst_meta
                .modified()
                .map_err(|e| SyncError::io("read mtime of", dst, &e))?;
            return Ok(src_mtime == dst_mtime);
        }
        contents_equal(src, dst)
    }

    /// Links match when the destination already points where a fresh copy would
    fn links_equal(&self, src: &Path, dst: &Path) -> Result<bool> {
        let expected = self.rewriter.resolve_copy_target(src)?;
        let actual = std::fs::read_link(dst).map_err(|e| SyncError::io("read symlink", dst, &e))?;
        Ok(expected.path() == actual)
    }
}

/// Names of the immediate entries of `dir`
///
/// # Errors
///
/// Returns an error if the directory or one of its entries cannot be read.
pub fn list_names(dir: &Path) -> Result<BTreeSet<OsString>> {
    std::fs::read_dir(dir)
        .map_err(|e| SyncError::io("read directory", dir, &e))?
        .map(|entry| {
            entry
                .map(|e| e.file_name())
                .map_err(|e| SyncError::io("read directory entry in", dir, &e))
        })
        .collect()
}

/// Byte-for-byte comparison of two files
///
/// # Errors
///
/// Returns an error if either file cannot be opened or read.
pub fn contents_equal(a: &Path, b: &Path) -> Result<bool> {
    let mut file_a = File::open(a).map_err(|e| SyncError::io("open", a, &e))?;
    let mut file_b = File::open(b).map_err(|e| SyncError::io("open", b, &e))?;
    let mut buf_a = vec![0u8; BUFFER_SIZE];
    let mut buf_b = vec![0u8; BUFFER_SIZE];

    loop {
        let n_a = read_full(&mut file_a, &mut buf_a).map_err(|e| SyncError::io("read", a, &e))?;
        let n_b = read_full(&mut file_b, &mut buf_b).map_err(|e| SyncError::io("read", b, &e))?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; short only at end of file
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
