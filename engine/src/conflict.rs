//! Sync conflicts - paths that cannot be reconciled automatically.

use crate::{FilePath, FileReference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A path where automatic reconciliation is impossible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncConflict {
    /// Two or more incompatible versions of the same file
    #[serde(rename_all = "camelCase")]
    MultipleVersion {
        conflicted_files: Vec<FileReference>,
        description: String,
    },
    /// One side modified a file the other side deleted
    #[serde(rename_all = "camelCase")]
    ModificationDeletion {
        modified_file: FileReference,
        deleted_file: FileReference,
        description: String,
    },
}

impl SyncConflict {
    /// Conflict between several versions of one file.
    ///
    /// The versions are stored in a canonical order so the conflict does
    /// not depend on which side reported which version.
    pub fn multiple_versions(versions: impl IntoIterator<Item = FileReference>) -> Self {
        let mut conflicted_files: Vec<FileReference> = versions.into_iter().collect();
        conflicted_files.sort_by(|a, b| {
            (a.last_write_time, a.length, &a.content_hash)
                .cmp(&(b.last_write_time, b.length, &b.content_hash))
        });
        let description = match conflicted_files.first() {
            Some(file) => format!(
                "{} versions of {} cannot be reconciled",
                conflicted_files.len(),
                file.path
            ),
            None => "multiple version conflict".to_string(),
        };
        SyncConflict::MultipleVersion {
            conflicted_files,
            description,
        }
    }

    /// Conflict between a modification and a deletion of one file.
    pub fn modification_deletion(modified_file: FileReference, deleted_file: FileReference) -> Self {
        let description = format!(
            "{} was modified on one side and deleted on the other",
            modified_file.path
        );
        SyncConflict::ModificationDeletion {
            modified_file,
            deleted_file,
            description,
        }
    }

    /// Path the conflict is about, if it names any file.
    pub fn path(&self) -> Option<&FilePath> {
        match self {
            SyncConflict::MultipleVersion {
                conflicted_files, ..
            } => conflicted_files.first().map(|f| &f.path),
            SyncConflict::ModificationDeletion { modified_file, .. } => Some(&modified_file.path),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            SyncConflict::MultipleVersion { description, .. }
            | SyncConflict::ModificationDeletion { description, .. } => description,
        }
    }
}

impl fmt::Display for SyncConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
