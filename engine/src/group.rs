//! Pairing of left and right changes by path.

use crate::{error::Result, Change, Error, FilePath};
use std::collections::BTreeMap;

/// The changes both participants made to one path.
///
/// At least one side is present; when both are, they share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedChange {
    path: FilePath,
    left: Option<Change>,
    right: Option<Change>,
}

impl GroupedChange {
    /// Pair two changes, checking the grouping invariants.
    pub fn new(left: Option<Change>, right: Option<Change>) -> Result<Self> {
        let path = match (&left, &right) {
            (Some(l), Some(r)) => {
                if l.path() != r.path() {
                    return Err(Error::MismatchedPaths {
                        from: l.path().clone(),
                        to: r.path().clone(),
                    });
                }
                l.path().clone()
            }
            (Some(l), None) => l.path().clone(),
            (None, Some(r)) => r.path().clone(),
            (None, None) => return Err(Error::EmptyGroupedChange),
        };
        Ok(Self { path, left, right })
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn left(&self) -> Option<&Change> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&Change> {
        self.right.as_ref()
    }

    /// The pair with sides swapped.
    pub fn swapped(&self) -> Self {
        Self {
            path: self.path.clone(),
            left: self.right.clone(),
            right: self.left.clone(),
        }
    }
}

/// Group two change sequences by path.
///
/// Produces one entry per distinct path, ordered by normalized path. Two
/// changes for the same path on one side indicate a broken diff producer
/// and are rejected, as are changes to a file at the root path.
pub fn group_changes(
    left: impl IntoIterator<Item = Change>,
    right: impl IntoIterator<Item = Change>,
) -> Result<Vec<GroupedChange>> {
    let mut slots: BTreeMap<FilePath, (Option<Change>, Option<Change>)> = BTreeMap::new();

    for change in left {
        change.validate()?;
        let slot = slots.entry(change.path().clone()).or_default();
        if slot.0.is_some() {
            return Err(Error::DuplicateChange(change.path().clone()));
        }
        slot.0 = Some(change);
    }

    for change in right {
        change.validate()?;
        let slot = slots.entry(change.path().clone()).or_default();
        if slot.1.is_some() {
            return Err(Error::DuplicateChange(change.path().clone()));
        }
        slot.1 = Some(change);
    }

    Ok(slots
        .into_iter()
        .map(|(path, (left, right))| GroupedChange { path, left, right })
        .collect())
}
