//! File references - immutable snapshots of a file's identity and metadata.

use crate::{FilePath, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An immutable snapshot of one file.
///
/// A reference owns its data and carries no link to the tree it was read
/// from, so it can be embedded in actions and applied against any tree.
/// Absence of a file is expressed as `Option<FileReference>::None`.
///
/// `PartialEq` compares every field. Reconciliation never uses it to decide
/// whether two versions are "the same file"; that is the job of a
/// [`FileEquality`](crate::FileEquality) oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    /// Rooted path of the file
    pub path: FilePath,
    /// Last write time, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_write_time: Option<Timestamp>,
    /// Length in bytes, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// SHA-256 hex digest of the content, if computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl FileReference {
    /// Create a reference with known metadata.
    pub fn new(path: FilePath, last_write_time: Timestamp, length: u64) -> Self {
        Self {
            path,
            last_write_time: Some(last_write_time),
            length: Some(length),
            content_hash: None,
        }
    }

    /// Create a reference with no metadata besides the path.
    pub fn bare(path: FilePath) -> Self {
        Self {
            path,
            last_write_time: None,
            length: None,
            content_hash: None,
        }
    }

    /// Record the content digest and length of `content`.
    pub fn with_content(mut self, content: &[u8]) -> Self {
        self.length = Some(content.len() as u64);
        self.content_hash = Some(content_hash(content));
        self
    }

    /// Return a copy of this reference placed at another path.
    pub fn with_path(&self, path: FilePath) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }

    /// File name (last path segment).
    pub fn name(&self) -> &str {
        self.path.name().unwrap_or_default()
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(time) = self.last_write_time {
            write!(f, "@{time}")?;
        }
        if let Some(length) = self.length {
            write!(f, " ({length} bytes)")?;
        }
        Ok(())
    }
}

/// SHA-256 hex digest of a byte slice.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
