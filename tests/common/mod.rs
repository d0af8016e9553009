//! Shared fixtures for the integration tests

use dirmirror::{SyncConfig, SyncStats, Synchronizer};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod log_capture;
pub mod tree;

/// A temporary source/destination pair
pub struct MirrorFixture {
    /// Keeps the directories alive for the duration of the test
    _temp: TempDir,
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl MirrorFixture {
    /// Create empty `src` and `dst` directories under a fresh temp dir
    ///
    /// Paths are canonical so they compare equal to resolved config roots.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let base = std::fs::canonicalize(temp.path()).expect("Failed to resolve temp directory");
        let src = base.join("src");
        let dst = base.join("dst");
        std::fs::create_dir(&src).expect("Failed to create source");
        std::fs::create_dir(&dst).expect("Failed to create destination");
        Self {
            _temp: temp,
            src,
            dst,
        }
    }

    /// One-shot config with default flags
    pub fn config(&self) -> SyncConfig {
        SyncConfig::new(&self.src, &self.dst).with_one_shot(true)
    }

    pub fn src_path(&self, relative: &str) -> PathBuf {
        self.src.join(relative)
    }

    pub fn dst_path(&self, relative: &str) -> PathBuf {
        self.dst.join(relative)
    }

    /// A path next to `src` and `dst`, outside both trees
    #[allow(dead_code)]
    pub fn outside(&self, relative: &str) -> PathBuf {
        self.src.parent().expect("src has a parent").join(relative)
    }
}

/// Run one pass with `config`, panicking if the pass aborts
#[allow(dead_code)]
pub fn sync_once(config: SyncConfig) -> SyncStats {
    Synchronizer::new(config)
        .expect("Invalid config")
        .sync_once()
        .expect("Pass aborted")
}

/// Assert that `path` exists without following a final symlink
#[allow(dead_code)]
pub fn assert_exists(path: &Path) {
    assert!(
        std::fs::symlink_metadata(path).is_ok(),
        "{} should exist",
        path.display()
    );
}

/// Assert that nothing exists at `path`, not even a dangling symlink
#[allow(dead_code)]
pub fn assert_absent(path: &Path) {
    assert!(
        std::fs::symlink_metadata(path).is_err(),
        "{} should not exist",
        path.display()
    );
}
