#![cfg(unix)]
//! Dry runs report decisions without touching the destination

mod common;

use common::log_capture::with_captured_logs;
use common::tree::{snapshot, symlink, write_file};
use common::{sync_once, MirrorFixture};

fn diverging_trees(fx: &MirrorFixture) {
    write_file(&fx.src_path("new.txt"), "new");
    write_file(&fx.src_path("newdir/f.txt"), "f");
    write_file(&fx.src_path("changed.txt"), "longer contents");
    symlink("new.txt", &fx.src_path("link"));
    write_file(&fx.dst_path("changed.txt"), "short");
    write_file(&fx.dst_path("stale/old.txt"), "old");
}

#[test]
fn test_dry_run_leaves_destination_untouched() {
    let fx = MirrorFixture::new();
    diverging_trees(&fx);
    let before = snapshot(&fx.dst);

    let (stats, logs) =
        with_captured_logs(|| sync_once(fx.config().with_dry_run(true).with_follow_symlinks(false)));

    assert_eq!(snapshot(&fx.dst), before);
    assert_eq!(stats.files_copied, 2, "new.txt and changed.txt");
    assert_eq!(stats.symlinks_copied, 1);
    assert_eq!(stats.trees_bulk_copied, 1);
    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.deleted, 1);

    let dst = fx.dst.display().to_string();
    assert_eq!(
        logs.lines_with(&format!("[dry-run] Would delete {dst}/stale")).len(),
        1
    );
    assert_eq!(
        logs.lines_with(&format!("[dry-run] Would replace {dst}/changed.txt"))
            .len(),
        1
    );
    assert!(!logs
        .lines_with(&format!("{}/newdir to {dst}/newdir", fx.src.display()))
        .is_empty());
    assert!(logs.lines_with("Will ").is_empty());
}

/// The same decisions are taken for real once dry-run is off
#[test]
fn test_dry_run_matches_real_pass() {
    let fx = MirrorFixture::new();
    diverging_trees(&fx);
    let config = fx.config().with_follow_symlinks(false);

    let planned = sync_once(config.clone().with_dry_run(true));
    let (done, logs) = with_captured_logs(|| sync_once(config));

    assert_eq!(planned.total_actions(), done.total_actions());
    assert!(!logs.lines_with("Will delete").is_empty());
    assert_eq!(snapshot(&fx.src), snapshot(&fx.dst));
}
