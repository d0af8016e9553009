//! Per-directory action dispatch
//!
//! `sync_dirs` handles one level of a [`DirectoryDiff`] and recurses into
//! common subdirectories the inode registry has not seen yet. Every action is
//! run through [`PassContext::isolate`], so a failing entry either aborts the
//! pass or is logged and left for the next pass. Names the comparator could
//! not compare are reported the same way and left alone.

use super::context::{PassContext, ReconcileAction};
use super::tree_copy::copy_directory;
use crate::classify::EntryKind;
use crate::compare::DirectoryDiff;
use crate::copy::{copy_file, copy_symlink, remove_entry};
use crate::error::{Result, SyncError};
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::path::Path;
use tracing::{debug, warn};

/// Source-side kinds of the children of one directory level
#[derive(Default)]
struct LevelKinds<'d> {
    source: BTreeMap<&'d OsStr, EntryKind>,
    /// Names excluded from every following step
    excluded: BTreeSet<&'d OsStr>,
}

impl LevelKinds<'_> {
    fn source_kind(&self, name: &OsStr) -> Option<EntryKind> {
        self.source.get(name).copied()
    }
}

/// Reconcile one directory pair and everything below it
///
/// # Errors
///
/// Only returns an error when the pass must stop (`stop_on_errors`).
pub(crate) fn sync_dirs(ctx: &mut PassContext<'_>, diff: &DirectoryDiff) -> Result<()> {
    ctx.stats.dirs_compared += 1;
    if diff.is_level_clean() {
        debug!("No changes at {}", diff.source_dir.display());
        return descend(ctx, diff, &LevelKinds::default());
    }

    let kinds = classify_level(ctx, diff)?;
    let src_dir = diff.source_dir.as_path();
    let dst_dir = diff.dest_dir.as_path();

    descend(ctx, diff, &kinds)?;

    for name in included(&diff.dest_only, &kinds) {
        let dst = dst_dir.join(name);
        delete_entry(ctx, &dst)?;
    }

    for name in included(&diff.source_only, &kinds) {
        let src = src_dir.join(name);
        let dst = dst_dir.join(name);
        if let Some(kind) = kinds.source_kind(name) {
            copy_entry(ctx, &src, &dst, kind)?;
        }
    }

    for name in included(&diff.common_irregular, &kinds) {
        let src = src_dir.join(name);
        let dst = dst_dir.join(name);
        if let Some(kind) = kinds.source_kind(name) {
            replace_entry(ctx, &src, &dst, kind)?;
        }
    }

    for name in included(&diff.diff_files, &kinds) {
        let src = src_dir.join(name);
        let dst = dst_dir.join(name);
        let kind = kinds.source_kind(name);
        if let Some(kind @ (EntryKind::File | EntryKind::Symlink)) = kind {
            replace_entry(ctx, &src, &dst, kind)?;
        } else {
            debug!("{} changed kind since comparison, left for the next pass", src.display());
        }
    }

    Ok(())
}

/// Recurse into the common subdirectories not excluded at this level
fn descend(ctx: &mut PassContext<'_>, diff: &DirectoryDiff, kinds: &LevelKinds<'_>) -> Result<()> {
    for name in included(&diff.common_dirs, kinds) {
        let src = diff.source_dir.join(name);
        let dst = diff.dest_dir.join(name);
        let observed = ctx.observe_dir(&src);
        if ctx.isolate(&src, observed)? != Some(true) {
            continue;
        }
        let compared = ctx.comparator.compare(&src, &dst);
        if let Some(sub_diff) = ctx.isolate(&src, compared)? {
            sync_dirs(ctx, &sub_diff)?;
        }
    }
    Ok(())
}

/// Classify every named child on the side(s) it exists on
///
/// Irregular children join the ignore set. A name is excluded from the rest
/// of this level when its source side is irregular or when either side cannot
/// be classified (the failure goes through the error policy). An irregular
/// destination side stays in play so deletes and replaces can refuse it.
///
/// Comparison failures are reported first. Those names are in no action
/// bucket, so nothing touches them this pass.
fn classify_level<'d>(
    ctx: &mut PassContext<'_>,
    diff: &'d DirectoryDiff,
) -> Result<LevelKinds<'d>> {
    let mut kinds = LevelKinds::default();

    for (name, message) in &diff.failed {
        let failed: Result<()> = Err(SyncError::CompareFailed(message.clone()));
        ctx.isolate(&diff.source_dir.join(name), failed)?;
    }

    for name in diff.names() {
        let name = name.as_os_str();

        if !diff.dest_only.contains(name) {
            let path = diff.source_dir.join(name);
            let classified = ctx.classify(&path);
            match ctx.isolate(&path, classified)? {
                Some(EntryKind::Irregular) => {
                    ctx.ignore(&path);
                    kinds.excluded.insert(name);
                }
                Some(kind) => {
                    kinds.source.insert(name, kind);
                }
                None => {
                    kinds.excluded.insert(name);
                }
            }
        }

        if !diff.source_only.contains(name) {
            let path = diff.dest_dir.join(name);
            let classified = ctx.classify(&path);
            match ctx.isolate(&path, classified)? {
                Some(EntryKind::Irregular) => ctx.ignore(&path),
                Some(_) => {}
                None => {
                    kinds.excluded.insert(name);
                }
            }
        }
    }

    Ok(kinds)
}

fn included<'n>(
    names: &'n BTreeSet<OsString>,
    kinds: &'n LevelKinds<'_>,
) -> impl Iterator<Item = &'n OsString> {
    names
        .iter()
        .filter(|name| !kinds.excluded.contains(name.as_os_str()))
}

/// Remove a destination-only entry
fn delete_entry(ctx: &mut PassContext<'_>, dst: &Path) -> Result<()> {
    if ctx.is_ignored(dst) {
        return Ok(());
    }
    ctx.announce(ReconcileAction::Delete(dst));
    ctx.stats.deleted += 1;
    if !ctx.dry_run() {
        ctx.isolate(dst, remove_entry(dst))?;
    }
    Ok(())
}

/// Copy one source entry to `dst`, which must not exist (outside dry-run)
pub(super) fn copy_entry(
    ctx: &mut PassContext<'_>,
    src: &Path,
    dst: &Path,
    kind: EntryKind,
) -> Result<()> {
    if ctx.is_ignored(src) {
        return Ok(());
    }
    match kind {
        EntryKind::Directory => copy_directory(ctx, src, dst),
        EntryKind::File => {
            ctx.announce(ReconcileAction::Copy { from: src, to: dst });
            ctx.stats.files_copied += 1;
            if !ctx.dry_run() {
                if let Some(bytes) = ctx.isolate(src, copy_file(src, dst))? {
                    ctx.stats.bytes_copied += bytes;
                }
            }
            Ok(())
        }
        EntryKind::Symlink => {
            if ctx.skip_ancestor_link(src) {
                return Ok(());
            }
            ctx.announce(ReconcileAction::Copy { from: src, to: dst });
            ctx.stats.symlinks_copied += 1;
            if !ctx.dry_run() {
                let copied = ctx
                    .rewriter
                    .resolve_copy_target(src)
                    .and_then(|target| copy_symlink(src, dst, target.path()));
                ctx.isolate(src, copied)?;
            }
            Ok(())
        }
        EntryKind::Irregular => {
            ctx.skip_irregular(src);
            Ok(())
        }
    }
}

/// Replace the destination entry with a copy of the source entry
fn replace_entry(
    ctx: &mut PassContext<'_>,
    src: &Path,
    dst: &Path,
    kind: EntryKind,
) -> Result<()> {
    if ctx.is_ignored(src) {
        return Ok(());
    }
    if ctx.is_ignored(dst) {
        warn!(
            "Warning: refusing to replace irregular entry {} with {}",
            dst.display(),
            src.display()
        );
        ctx.stats.replaces_refused += 1;
        return Ok(());
    }

    // Nothing is mirrored for a skipped link, so the old entry just goes
    if matches!(kind, EntryKind::Symlink) && ctx.skip_ancestor_link(src) {
        return delete_entry(ctx, dst);
    }

    ctx.announce(ReconcileAction::Replace { from: src, to: dst });
    ctx.stats.replaced += 1;
    if !ctx.dry_run() && ctx.isolate(dst, remove_entry(dst))?.is_none() {
        return Ok(());
    }
    copy_entry(ctx, src, dst, kind)
}
