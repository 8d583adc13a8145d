//! # SyncTool Engine
//!
//! A deterministic reconciliation engine for folders kept in sync across
//! several repositories.
//!
//! Each participant records its folder as snapshots in a [`History`]. To
//! synchronize two participants, the engine takes the changes each side
//! made since they last agreed and decides, path by path, what has to
//! happen so both sides end up identical.
//!
//! ## Design Principles
//!
//! - **No IO**: trees and snapshots are plain values; reading a real
//!   filesystem or version control store is the caller's job
//! - **Deterministic**: output is ordered by path, never by hash order
//! - **Conflicts are data**: genuine ambiguity is reported as a
//!   [`SyncConflict`], never as an error
//!
//! ## Core Concepts
//!
//! ### Changes
//!
//! A [`Change`] is one transition of a single file ([`ChangeType::Added`],
//! [`ChangeType::Deleted`], [`ChangeType::Modified`]). A [`DiffSource`]
//! bundles the changes of one participant with its current tree.
//!
//! ### Equality
//!
//! Every "same file?" decision goes through a [`FileEquality`] oracle:
//! [`MetadataEquality`] compares length and write time,
//! [`ContentHashEquality`] compares SHA-256 digests.
//!
//! ### Synchronization
//!
//! The [`Synchronizer`] pairs both sides' changes by path and produces a
//! [`SynchronizationResult`] of [`SyncAction`]s and [`SyncConflict`]s.
//! [`SynchronizationResult::apply_to`] replays the actions onto a tree.
//!
//! ### Conflict resolution
//!
//! Recorded conflicts live in a [`ConflictStore`]. A
//! [`ConflictResolutionPass`] builds a [`ChangeGraph`] per conflict from
//! what every history did afterwards and settles the conflicts whose
//! lineages converged.
//!
//! ## Quick Start
//!
//! ```rust
//! use synctool_engine::{
//!     Change, Directory, FilePath, FileReference, FileSystemDiff, MetadataEquality,
//!     SyncAction, SyncParticipant, Synchronizer,
//! };
//! use std::sync::Arc;
//!
//! let path = FilePath::parse("/notes.txt").unwrap();
//! let v1 = FileReference::new(path.clone(), 1000, 12);
//! let v2 = FileReference::new(path.clone(), 2000, 15);
//!
//! // Left edited the file, right did nothing
//! let left = FileSystemDiff::new(
//!     "laptop",
//!     Directory::from_files(vec![v2.clone()]).unwrap(),
//!     vec![Change::modified(v1.clone(), v2.clone()).unwrap()],
//! );
//! let right = FileSystemDiff::new(
//!     "desktop",
//!     Directory::from_files(vec![v1.clone()]).unwrap(),
//!     vec![],
//! );
//!
//! let synchronizer = Synchronizer::new(Arc::new(MetadataEquality));
//! let result = synchronizer.synchronize(&left, &right).unwrap();
//!
//! assert_eq!(
//!     result.actions,
//!     vec![SyncAction::replace(SyncParticipant::Right, v1, v2)]
//! );
//! assert!(result.conflicts.is_empty());
//! ```
//!
//! ## Configuration
//!
//! [`SyncOptions`] selects the oracle, the resolution policy and excluded
//! paths, from environment variables or JSON.
//!
//! ## Persistence
//!
//! [`InMemoryConflictStore::to_json`] and [`InMemoryConflictStore::from_json`]
//! persist the conflict store as a versioned JSON snapshot.

pub mod action;
pub mod change;
pub mod config;
pub mod conflict;
pub mod diff;
pub mod equality;
pub mod error;
pub mod file;
pub mod filter;
pub mod graph;
pub mod group;
pub mod history;
pub mod path;
pub mod resolver;
pub mod result;
pub mod store;
pub mod synchronizer;
pub mod tree;

// Re-export main types at crate root
pub use action::{SyncAction, SyncParticipant};
pub use change::{Change, ChangeList, ChangeType};
pub use config::{ConfigError, SyncOptions};
pub use conflict::SyncConflict;
pub use diff::{DiffSource, FileSystemDiff, FilteredDiff};
pub use equality::{ContentHashEquality, EqualityKind, FileEquality, MetadataEquality};
pub use error::Error;
pub use file::FileReference;
pub use filter::PathFilter;
pub use graph::{ChangeGraph, NodeId};
pub use group::{group_changes, GroupedChange};
pub use history::{diff_trees, History, Snapshot, SnapshotId};
pub use path::FilePath;
pub use resolver::{
    resolve_conflicts, ConflictResolutionPass, ConflictResolver, HistoryLookup,
    LatestWriteTimeResolver, Resolution, ResolutionPolicy, ResolutionReport,
    SimpleConflictResolver,
};
pub use result::SynchronizationResult;
pub use store::{
    ConflictId, ConflictInfo, ConflictStore, ConflictStoreSnapshot, InMemoryConflictStore,
    ResolutionAction, ResolvedConflict, StoreUpdate, StoreUpdateBuilder,
    CONFLICT_STORE_FORMAT_VERSION,
};
pub use synchronizer::{Outcome, Synchronizer};
pub use tree::Directory;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
