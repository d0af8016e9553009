//! Cycle-safe subtree copying
//!
//! A directory that only exists in the source is first scanned: the scan
//! registers every directory below it in the inode registry without copying
//! anything. If no cycle turns up, the whole subtree is copied in one bulk
//! walk. If one does, the subtree is rebuilt by hand, bulk-copying only the
//! children that scanned clean and leaving the cyclic ones out.

use super::context::{PassContext, ReconcileAction};
use super::reconcile::copy_entry;
use crate::classify::EntryKind;
use crate::compare::list_names;
use crate::copy::{bulk_copy_tree, copy_dir_metadata, BulkCopyOptions};
use crate::error::{Result, SyncError};
use std::ffi::OsString;
use std::path::Path;
use tracing::{debug, info};

/// Copy the source-only directory `src` to `dst`
///
/// # Errors
///
/// Only returns an error when the pass must stop (`stop_on_errors`).
pub(super) fn copy_directory(ctx: &mut PassContext<'_>, src: &Path, dst: &Path) -> Result<()> {
    if copy_tree(ctx, src, dst)? {
        bulk_copy(ctx, src, dst)?;
    }
    Ok(())
}

/// Scan `src` for cycles, rebuilding it at `dst` by hand if one is found
///
/// Returns `true` when the subtree is safe and nothing has been copied yet;
/// the caller then bulk-copies it. Returns `false` when the subtree was
/// skipped or has already been rebuilt entry by entry, so an enclosing scan
/// must not bulk-copy it again.
///
/// # Errors
///
/// Only returns an error when the pass must stop (`stop_on_errors`).
pub(super) fn copy_tree(ctx: &mut PassContext<'_>, src: &Path, dst: &Path) -> Result<bool> {
    let classified = ctx.classify(src);
    match ctx.isolate(src, classified)? {
        Some(EntryKind::Irregular) => {
            ctx.skip_irregular(src);
            return Ok(false);
        }
        Some(_) => {}
        None => return Ok(false),
    }

    let observed = ctx.observe_dir(src);
    if ctx.isolate(src, observed)? != Some(true) {
        return Ok(false);
    }

    let listed = list_names(src);
    let Some(names) = ctx.isolate(src, listed)? else {
        return Ok(false);
    };

    let mut subdirs: Vec<(OsString, bool)> = Vec::new();
    let mut leaves: Vec<(OsString, EntryKind)> = Vec::new();
    for name in names {
        let child = src.join(&name);
        let classified = ctx.classify(&child);
        match ctx.isolate(&child, classified)? {
            Some(EntryKind::Directory) => {
                let safe = copy_tree(ctx, &child, &dst.join(&name))?;
                subdirs.push((name, safe));
            }
            Some(kind) => leaves.push((name, kind)),
            // Unreadable child: a bulk copy would trip over it as well
            None => subdirs.push((name, false)),
        }
    }

    if subdirs.iter().all(|(_, safe)| *safe) {
        debug!("No cycle below {}", src.display());
        return Ok(true);
    }

    info!(
        "Cycle detected below {}, copying it entry by entry",
        src.display()
    );
    ctx.stats.trees_reconstructed += 1;
    if !ctx.dry_run() {
        let created = std::fs::create_dir_all(dst)
            .map_err(|e| SyncError::io("create directory", dst, &e));
        if ctx.isolate(dst, created)?.is_none() {
            return Ok(false);
        }
    }

    for (name, safe) in &subdirs {
        if *safe {
            bulk_copy(ctx, &src.join(name), &dst.join(name))?;
        }
    }
    for (name, kind) in leaves {
        copy_entry(ctx, &src.join(&name), &dst.join(&name), kind)?;
    }

    if !ctx.dry_run() {
        let applied = std::fs::metadata(src)
            .map_err(|e| SyncError::io("read metadata of", src, &e))
            .and_then(|meta| copy_dir_metadata(&meta, dst));
        ctx.isolate(dst, applied)?;
    }

    Ok(false)
}

/// Copy a subtree found free of cycles in one walk
fn bulk_copy(ctx: &mut PassContext<'_>, src: &Path, dst: &Path) -> Result<()> {
    ctx.announce(ReconcileAction::Copy { from: src, to: dst });
    ctx.stats.trees_bulk_copied += 1;
    if ctx.dry_run() {
        return Ok(());
    }

    let options = BulkCopyOptions {
        follow_symlinks: ctx.config.follow_symlinks,
        rewriter: &ctx.rewriter,
    };
    let copied = bulk_copy_tree(src, dst, &options);
    if let Some(tree) = ctx.isolate(src, copied)? {
        ctx.stats.bytes_copied += tree.bytes;
        ctx.stats.irregular_skipped += tree.irregular_skipped;
        ctx.stats.cycles_skipped += tree.cycles_skipped;
        debug!(
            "Bulk copied {}: {} dirs, {} files, {} symlinks",
            src.display(),
            tree.dirs,
            tree.files,
            tree.symlinks
        );
    }
    Ok(())
}
