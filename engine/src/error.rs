//! Error types for the sync engine.
//!
//! Conflicts are not errors: they are returned as data in a
//! [`SynchronizationResult`](crate::SynchronizationResult). The variants
//! below cover the three remaining classes: invariant violations in the
//! diff inputs, actions that no longer apply to a target tree, and lookup
//! or persistence failures.

use crate::{ChangeType, FilePath, SnapshotId};
use thiserror::Error;

/// All possible errors from the sync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Invariant violations
    #[error("invalid {change_type:?} change for {path}: {reason}")]
    InvalidChange {
        change_type: ChangeType,
        path: String,
        reason: String,
    },

    #[error("change versions refer to different paths: {from} and {to}")]
    MismatchedPaths { from: FilePath, to: FilePath },

    #[error("change list must not be empty")]
    EmptyChangeList,

    #[error("grouped change has neither a left nor a right change")]
    EmptyGroupedChange,

    #[error("more than one change for {0} in a single diff")]
    DuplicateChange(FilePath),

    #[error("file {0} was reported added on one side and deleted on the other")]
    AddedAndDeleted(FilePath),

    #[error("file {0} was modified but does not exist on the unchanged side")]
    ModifiedFileMissing(FilePath),

    #[error("double modification of {0} without common base version")]
    NoCommonBaseVersion(FilePath),

    #[error("modification and deletion of {0} with no common version")]
    NoCommonDeletionVersion(FilePath),

    // Apply errors
    #[error("cannot apply actions while {0} conflict(s) are unresolved")]
    UnresolvedConflicts(usize),

    #[error("cannot add {0}: file already exists")]
    FileAlreadyExists(FilePath),

    #[error("cannot update {0}: file not found")]
    FileNotFound(FilePath),

    #[error("cannot update {0}: current file does not match the expected version")]
    FileVersionMismatch(FilePath),

    // Lookup and persistence errors
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("snapshot {id} not found in history '{history}'")]
    SnapshotNotFound { history: String, id: SnapshotId },

    #[error("snapshot {from} is not an ancestor of {to} in history '{history}'")]
    NotAnAncestor {
        history: String,
        from: SnapshotId,
        to: SnapshotId,
    },

    #[error("history not found: {0}")]
    HistoryNotFound(String),

    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    #[error("invalid conflict store snapshot: {0}")]
    InvalidStoreSnapshot(String),
}

impl Error {
    /// Whether this error means the diff inputs were malformed.
    ///
    /// These abort a reconciliation pass; no partial result is returned.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::InvalidChange { .. }
                | Error::MismatchedPaths { .. }
                | Error::EmptyChangeList
                | Error::EmptyGroupedChange
                | Error::DuplicateChange(_)
                | Error::AddedAndDeleted(_)
                | Error::ModifiedFileMissing(_)
                | Error::NoCommonBaseVersion(_)
                | Error::NoCommonDeletionVersion(_)
        )
    }

    /// Whether this error means a result could not be applied to a tree
    /// because the tree changed or conflicts are still open.
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedConflicts(_)
                | Error::FileAlreadyExists(_)
                | Error::FileNotFound(_)
                | Error::FileVersionMismatch(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
