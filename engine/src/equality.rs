//! File equality oracles.
//!
//! Every "is this the same file?" decision made during reconciliation goes
//! through a [`FileEquality`] implementation. Paths are never part of the
//! comparison, since the same logical file can live at different paths in
//! different trees.

use crate::FileReference;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Decides whether two file snapshots represent the same content.
///
/// Implementations must be pure and form an equivalence relation
/// (reflexive, symmetric, transitive). They must not hold mutable state,
/// so one oracle can be shared by concurrent synchronization passes.
pub trait FileEquality: Debug + Send + Sync {
    fn equals(&self, a: &FileReference, b: &FileReference) -> bool;

    /// Compare optional versions, where `None` means "file does not exist".
    fn equals_opt(&self, a: Option<&FileReference>, b: Option<&FileReference>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.equals(a, b),
            _ => false,
        }
    }
}

/// Equal iff length and last write time match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataEquality;

impl FileEquality for MetadataEquality {
    fn equals(&self, a: &FileReference, b: &FileReference) -> bool {
        a.length == b.length && a.last_write_time == b.last_write_time
    }
}

/// Equal iff both content digests are present and match.
///
/// References without a digest only equal other references without one,
/// and then by metadata. This keeps the relation transitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentHashEquality;

impl FileEquality for ContentHashEquality {
    fn equals(&self, a: &FileReference, b: &FileReference) -> bool {
        match (&a.content_hash, &b.content_hash) {
            (Some(x), Some(y)) => x == y,
            (None, None) => MetadataEquality.equals(a, b),
            _ => false,
        }
    }
}

/// Built-in oracle selection, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EqualityKind {
    /// Compare length and last write time (default)
    #[default]
    Metadata,
    /// Compare SHA-256 content digests
    ContentHash,
}

impl EqualityKind {
    /// Instantiate the oracle.
    pub fn build(self) -> Arc<dyn FileEquality> {
        match self {
            EqualityKind::Metadata => Arc::new(MetadataEquality),
            EqualityKind::ContentHash => Arc::new(ContentHashEquality),
        }
    }
}
