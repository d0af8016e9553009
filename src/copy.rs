//! Copy and removal primitives
//!
//! These are the mutations the reconciliation engine performs on the
//! destination. None of them look at the pass state: cycle checks happen
//! before they are called.
//!
//! # Operations
//!
//! - **`copy_file`**: byte copy with permissions and timestamps
//! - **`copy_symlink`**: recreate a link with a chosen target
//! - **`remove_entry`**: delete a file, link or whole directory, never following links
//! - **`bulk_copy_tree`**: one walk copying an entire subtree known to be acyclic

use crate::classify::EntryKind;
use crate::error::{Result, SyncError};
use crate::inode_registry::resolves_to_ancestor;
use crate::symlink::SymlinkRewriter;
use filetime::FileTime;
use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counters for a single bulk subtree copy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeCopyStats {
    /// Directories created
    pub dirs: u64,
    /// Regular files copied
    pub files: u64,
    /// Symlinks recreated
    pub symlinks: u64,
    /// Irregular entries left out
    pub irregular_skipped: u64,
    /// Links back to an enclosing directory left out
    pub cycles_skipped: u64,
    /// Bytes written
    pub bytes: u64,
}

/// Copy a regular file with its permissions, access and modification times
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns an error if the source cannot be read, the destination cannot be
/// written, or the timestamps cannot be applied.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let meta = fs::metadata(src).map_err(|e| SyncError::io("read metadata of", src, &e))?;
    let bytes = fs::copy(src, dst).map_err(|e| {
        SyncError::CopyFailed(format!(
            "Failed to copy {} to {}: {e}",
            src.display(),
            dst.display()
        ))
    })?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| SyncError::io("preserve timestamps of", dst, &e))?;
    Ok(bytes)
}

/// Create `dst` as a symlink to `target`, carrying over the timestamps of `src`
///
/// An entry already at `dst` is removed first.
///
/// # Errors
///
/// Returns an error if the old entry cannot be removed, the link cannot be
/// created, or its timestamps cannot be set.
pub fn copy_symlink(src: &Path, dst: &Path, target: &Path) -> Result<()> {
    if fs::symlink_metadata(dst).is_ok() {
        remove_entry(dst)?;
    }
    std::os::unix::fs::symlink(target, dst).map_err(|e| {
        SyncError::FileSystem(format!(
            "Failed to create symlink {} -> {}: {e}",
            dst.display(),
            target.display()
        ))
    })?;

    let meta =
        fs::symlink_metadata(src).map_err(|e| SyncError::io("read metadata of", src, &e))?;
    filetime::set_symlink_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| SyncError::io("preserve symlink timestamps of", dst, &e))?;

    debug!("Copied symlink {} -> {}", dst.display(), target.display());
    Ok(())
}

/// Remove whatever is at `path`
///
/// Symlinks are unlinked, never followed; directories are removed with all
/// of their contents.
///
/// # Errors
///
/// Returns an error if the entry cannot be inspected or removed.
pub fn remove_entry(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| SyncError::io("inspect", path, &e))?;
    if meta.file_type().is_dir() {
        fs::remove_dir_all(path).map_err(|e| SyncError::io("remove directory", path, &e))
    } else {
        fs::remove_file(path).map_err(|e| SyncError::io("remove", path, &e))
    }
}

/// Apply permissions and timestamps of a source directory to `dst`
///
/// # Errors
///
/// Returns an error if permissions or timestamps cannot be set.
pub fn copy_dir_metadata(meta: &Metadata, dst: &Path) -> Result<()> {
    fs::set_permissions(dst, meta.permissions())
        .map_err(|e| SyncError::io("set permissions of", dst, &e))?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )
    .map_err(|e| SyncError::io("preserve timestamps of", dst, &e))
}

/// Options for [`bulk_copy_tree`]
#[derive(Debug, Clone, Copy)]
pub struct BulkCopyOptions<'a> {
    /// Copy what symlinks point to instead of the links
    pub follow_symlinks: bool,
    /// Rewrites source-internal link targets
    pub rewriter: &'a SymlinkRewriter,
}

/// Copy the whole subtree at `src` to `dst` in one walk
///
/// Only valid for a subtree that has been scanned free of cycles: with
/// `follow_symlinks` the walk dereferences every link it meets. Without it,
/// links resolving to one of their own ancestors are left out. Irregular
/// entries are skipped with a warning. Directory permissions and times are
/// applied after their contents, deepest first.
///
/// # Errors
///
/// Returns an error on the first entry that cannot be read or written.
pub fn bulk_copy_tree(src: &Path, dst: &Path, options: &BulkCopyOptions<'_>) -> Result<TreeCopyStats> {
    let mut stats = TreeCopyStats::default();
    let mut dir_metadata: Vec<(PathBuf, Metadata)> = Vec::new();

    let walker = WalkDir::new(src)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                // Broken links surface as walk errors when following
                if let Some(link) = dangling_link(&err) {
                    let target = destination_for(src, dst, link)?;
                    let link_target = options.rewriter.resolve_copy_target(link)?;
                    copy_symlink(link, &target, link_target.path())?;
                    stats.symlinks += 1;
                    continue;
                }
                return Err(SyncError::CopyFailed(format!(
                    "Failed to walk {}: {err}",
                    src.display()
                )));
            }
        };

        let path = entry.path();
        let target = destination_for(src, dst, path)?;

        match EntryKind::from_file_type(entry.file_type()) {
            EntryKind::Directory => {
                fs::create_dir_all(&target)
                    .map_err(|e| SyncError::io("create directory", &target, &e))?;
                let meta = entry.metadata().map_err(|e| {
                    SyncError::FileSystem(format!(
                        "Failed to read metadata of {}: {e}",
                        path.display()
                    ))
                })?;
                dir_metadata.push((target, meta));
                stats.dirs += 1;
            }
            EntryKind::File => {
                stats.bytes += copy_file(path, &target)?;
                stats.files += 1;
            }
            EntryKind::Symlink if resolves_to_ancestor(path) => {
                warn!(
                    "Warning: skip previously encountered {} (links to an enclosing directory)",
                    path.display()
                );
                stats.cycles_skipped += 1;
            }
            EntryKind::Symlink => {
                let link_target = options.rewriter.resolve_copy_target(path)?;
                copy_symlink(path, &target, link_target.path())?;
                stats.symlinks += 1;
            }
            EntryKind::Irregular => {
                warn!("Skipping irregular entry {}", path.display());
                stats.irregular_skipped += 1;
            }
        }
    }

    for (dir, meta) in dir_metadata.iter().rev() {
        copy_dir_metadata(meta, dir)?;
    }

    Ok(stats)
}

fn destination_for(src: &Path, dst: &Path, path: &Path) -> Result<PathBuf> {
    let relative = path.strip_prefix(src).map_err(|_| {
        SyncError::CopyFailed(format!(
            "{} is outside of {}",
            path.display(),
            src.display()
        ))
    })?;
    if relative.as_os_str().is_empty() {
        Ok(dst.to_path_buf())
    } else {
        Ok(dst.join(relative))
    }
}

fn dangling_link(err: &walkdir::Error) -> Option<&Path> {
    let path = err.path()?;
    let not_found = err
        .io_error()
        .is_some_and(|e| e.kind() == ErrorKind::NotFound);
    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    (not_found && is_link).then_some(path)
}
