//! Change types for expressing file transitions.
//!
//! A [`Change`] is one atomic transition of a single path. A [`ChangeList`]
//! is the chronological history of one path across a range of snapshots.

use crate::{error::Result, Error, FilePath, FileReference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of transition a change describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Deleted,
    Modified,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeType::Added => "added",
            ChangeType::Deleted => "deleted",
            ChangeType::Modified => "modified",
        };
        f.write_str(name)
    }
}

/// One transition of a single file.
///
/// Invariants, checked on construction:
/// - `Added`: no `from_version`, a `to_version`
/// - `Deleted`: a `from_version`, no `to_version`
/// - `Modified`: both versions, on the same path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawChange")]
pub struct Change {
    change_type: ChangeType,
    #[serde(skip)]
    path: FilePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_version: Option<FileReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_version: Option<FileReference>,
}

impl Change {
    /// Create a change, validating the version invariants.
    pub fn new(
        change_type: ChangeType,
        from_version: Option<FileReference>,
        to_version: Option<FileReference>,
    ) -> Result<Self> {
        let path = from_version.as_ref().or(to_version.as_ref()).map(|f| f.path.clone());
        let invalid = |reason: &str| Error::InvalidChange {
            change_type,
            path: path.as_ref().map(ToString::to_string).unwrap_or_default(),
            reason: reason.to_string(),
        };

        match (change_type, &from_version, &to_version) {
            (ChangeType::Added, None, Some(_)) => {}
            (ChangeType::Added, _, _) => {
                return Err(invalid("an addition needs only a new version"));
            }
            (ChangeType::Deleted, Some(_), None) => {}
            (ChangeType::Deleted, _, _) => {
                return Err(invalid("a deletion needs only an old version"));
            }
            (ChangeType::Modified, Some(from), Some(to)) => {
                if from.path != to.path {
                    return Err(Error::MismatchedPaths {
                        from: from.path.clone(),
                        to: to.path.clone(),
                    });
                }
            }
            (ChangeType::Modified, _, _) => {
                return Err(invalid("a modification needs both versions"));
            }
        }

        // Every accepted combination carries at least one version
        let Some(path) = path else {
            return Err(Error::InvalidChange {
                change_type,
                path: String::new(),
                reason: "a change needs at least one version".to_string(),
            });
        };

        let change = Self {
            change_type,
            path,
            from_version,
            to_version,
        };
        change.validate()?;
        Ok(change)
    }

    /// Check invariants the infallible constructors cannot: the changed
    /// file must not sit at the root path.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_root() {
            return Err(Error::InvalidChange {
                change_type: self.change_type,
                path: self.path.to_string(),
                reason: "a file cannot live at the root".to_string(),
            });
        }
        Ok(())
    }

    /// A file that did not exist before.
    pub fn added(to_version: FileReference) -> Self {
        Self {
            change_type: ChangeType::Added,
            path: to_version.path.clone(),
            from_version: None,
            to_version: Some(to_version),
        }
    }

    /// A file that no longer exists.
    pub fn deleted(from_version: FileReference) -> Self {
        Self {
            change_type: ChangeType::Deleted,
            path: from_version.path.clone(),
            from_version: Some(from_version),
            to_version: None,
        }
    }

    /// A file that exists on both ends of the transition.
    pub fn modified(from_version: FileReference, to_version: FileReference) -> Result<Self> {
        Self::new(ChangeType::Modified, Some(from_version), Some(to_version))
    }

    /// Derive the change between two optional versions.
    ///
    /// Returns `None` when neither version exists.
    pub fn between(
        from_version: Option<FileReference>,
        to_version: Option<FileReference>,
    ) -> Result<Option<Self>> {
        match (from_version, to_version) {
            (None, None) => Ok(None),
            (None, Some(to)) => Ok(Some(Self::added(to))),
            (Some(from), None) => Ok(Some(Self::deleted(from))),
            (Some(from), Some(to)) => Self::modified(from, to).map(Some),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn from_version(&self) -> Option<&FileReference> {
        self.from_version.as_ref()
    }

    pub fn to_version(&self) -> Option<&FileReference> {
        self.to_version.as_ref()
    }

    /// Path of the changed file.
    pub fn path(&self) -> &FilePath {
        &self.path
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.from_version, &self.to_version) {
            (Some(from), Some(to)) => write!(f, "{} {from} -> {to}", self.change_type),
            (Some(from), None) => write!(f, "{} {from}", self.change_type),
            (None, Some(to)) => write!(f, "{} {to}", self.change_type),
            (None, None) => write!(f, "{}", self.change_type),
        }
    }
}

/// Wire form of a change, validated into [`Change`] on deserialization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChange {
    change_type: ChangeType,
    #[serde(default)]
    from_version: Option<FileReference>,
    #[serde(default)]
    to_version: Option<FileReference>,
}

impl TryFrom<RawChange> for Change {
    type Error = Error;

    fn try_from(raw: RawChange) -> Result<Self> {
        Change::new(raw.change_type, raw.from_version, raw.to_version)
    }
}

/// Chronological history of one path, oldest change first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Change>", into = "Vec<Change>")]
pub struct ChangeList {
    path: FilePath,
    changes: Vec<Change>,
}

impl ChangeList {
    /// Create a change list, checking it is non-empty and single-path.
    pub fn new(changes: Vec<Change>) -> Result<Self> {
        let Some(first) = changes.first() else {
            return Err(Error::EmptyChangeList);
        };
        let path = first.path().clone();

        if let Some(other) = changes.iter().find(|c| c.path() != &path) {
            return Err(Error::MismatchedPaths {
                from: path,
                to: other.path().clone(),
            });
        }

        Ok(Self { path, changes })
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Oldest change.
    pub fn first(&self) -> &Change {
        &self.changes[0]
    }

    /// Most recent change.
    pub fn last(&self) -> &Change {
        &self.changes[self.changes.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Collapse the history into one change from the oldest state to the
    /// newest one.
    ///
    /// Returns `None` if the file did not exist at either end, e.g. it was
    /// added and deleted again inside the window.
    pub fn net_change(&self) -> Option<Change> {
        let from = self.first().from_version().cloned();
        let to = self.last().to_version().cloned();
        // Both versions share `self.path`, so this cannot fail
        Change::between(from, to).ok().flatten()
    }
}

impl TryFrom<Vec<Change>> for ChangeList {
    type Error = Error;

    fn try_from(changes: Vec<Change>) -> Result<Self> {
        ChangeList::new(changes)
    }
}

impl From<ChangeList> for Vec<Change> {
    fn from(list: ChangeList) -> Self {
        list.changes
    }
}
