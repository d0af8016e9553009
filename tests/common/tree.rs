//! Building and snapshotting small directory trees
#![allow(dead_code)] // Not every test binary uses every helper

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a snapshot records for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir,
    File(Vec<u8>),
    Symlink(PathBuf),
    Other,
}

/// Write `contents` to `path`, creating parent directories
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, contents).expect("Failed to write file");
}

pub fn mkdir(path: &Path) {
    fs::create_dir_all(path).expect("Failed to create directory");
}

pub fn symlink(target: impl AsRef<Path>, link: &Path) {
    std::os::unix::fs::symlink(target, link).expect("Failed to create symlink");
}

/// Leave a Unix socket file at `path`; the entry outlives the listener
#[allow(dead_code)]
pub fn make_socket(path: &Path) {
    let listener = UnixListener::bind(path).expect("Failed to bind socket");
    drop(listener);
}

/// Record every entry below `root` without following symlinks
///
/// Keys are relative to `root`; the root itself is not included.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Node> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.expect("Failed to walk tree");
            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("entry is under root")
                .to_path_buf();
            let file_type = entry.file_type();
            let node = if file_type.is_dir() {
                Node::Dir
            } else if file_type.is_file() {
                Node::File(fs::read(entry.path()).expect("Failed to read file"))
            } else if file_type.is_symlink() {
                Node::Symlink(fs::read_link(entry.path()).expect("Failed to read symlink"))
            } else {
                Node::Other
            };
            (relative, node)
        })
        .collect()
}
