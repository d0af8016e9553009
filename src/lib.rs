//! dirmirror - periodic one-way directory mirroring
//!
//! Keeps a destination directory tree identical to a source tree by running
//! reconciliation passes on a fixed cadence. Each pass compares the two trees
//! level by level, deletes what the source no longer has, copies what the
//! destination lacks and replaces entries that differ.
//!
//! The engine is safe against symlink and bind-mount cycles: every directory
//! identity (device, inode) is recorded the first time a pass sees it and any
//! later sighting is skipped. Absolute symlinks that point into the source
//! tree are rewritten to point at the matching place in the destination.
//!
//! # Module Organization
//!
//! - [`classify`]: Entry kind detection with and without following symlinks
//! - [`compare`]: One-level directory comparison
//! - [`inode_registry`]: Per-pass cycle guard
//! - [`symlink`]: Symlink target rewriting
//! - [`copy`]: File, symlink and bulk subtree copy primitives
//! - [`mirror`]: The reconciliation engine
//! - [`scheduler`]: Fixed-cadence pass loop
//! - [`config`], [`cli`], [`logging`], [`error`], [`stats`]: Ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use dirmirror::{SyncConfig, Synchronizer};
//!
//! let config = SyncConfig::new("/data/photos", "/backup/photos").with_one_shot(true);
//! let mirror = Synchronizer::new(config)?;
//! let stats = mirror.sync_once()?;
//! println!("{stats}");
//! # Ok::<(), dirmirror::SyncError>(())
//! ```

#[cfg(not(unix))]
compile_error!("dirmirror relies on Unix device and inode numbers");

pub mod classify;
pub mod cli;
pub mod compare;
pub mod config;
pub mod copy;
pub mod error;
pub mod inode_registry;
pub mod logging;
pub mod mirror;
pub mod scheduler;
pub mod stats;
pub mod symlink;

pub use classify::EntryKind;
pub use compare::{DirectoryComparator, DirectoryDiff};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use inode_registry::{InodeInfo, InodeRegistry};
pub use mirror::{ReconcileAction, Synchronizer};
pub use scheduler::{Clock, Scheduler, SystemClock};
pub use stats::SyncStats;
pub use symlink::{LinkTarget, SymlinkRewriter};
