//! Snapshot histories and tree diffing.
//!
//! A [`History`] is an explicit arena of snapshots keyed by [`SnapshotId`].
//! Snapshots are only added through [`History::add_snapshot`]; nothing is
//! loaded behind the caller's back. Histories are linear: each new snapshot
//! is a child of the previous one.

use crate::{
    error::Result, Change, ChangeList, Directory, Error, FileEquality, FilePath, FileSystemDiff,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identifier of a snapshot within one history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A recorded state of a history's file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    id: SnapshotId,
    parent: Option<SnapshotId>,
    root: Directory,
}

impl Snapshot {
    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn parent(&self) -> Option<SnapshotId> {
        self.parent
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }
}

/// The snapshots of one participant.
#[derive(Debug, Clone)]
pub struct History {
    name: String,
    equality: Arc<dyn FileEquality>,
    snapshots: Vec<Snapshot>,
}

impl History {
    /// Create an empty history. `equality` decides which files changed
    /// between snapshots.
    pub fn new(name: impl Into<String>, equality: Arc<dyn FileEquality>) -> Self {
        Self {
            name: name.into(),
            equality,
            snapshots: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Record a new snapshot on top of the latest one.
    pub fn add_snapshot(&mut self, root: Directory) -> SnapshotId {
        let id = SnapshotId(self.snapshots.len() as u64 + 1);
        let parent = self.latest_snapshot_id();
        self.snapshots.push(Snapshot { id, parent, root });
        debug!(history = %self.name, snapshot = %id, "snapshot added");
        id
    }

    pub fn latest_snapshot_id(&self) -> Option<SnapshotId> {
        self.snapshots.last().map(Snapshot::id)
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn get_snapshot(&self, id: SnapshotId) -> Result<&Snapshot> {
        self.index_of(id).map(|idx| &self.snapshots[idx])
    }

    fn index_of(&self, id: SnapshotId) -> Result<usize> {
        self.snapshots
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::SnapshotNotFound {
                history: self.name.clone(),
                id,
            })
    }

    /// Resolve a `from..=to` window into snapshot indices.
    ///
    /// `from == None` starts before the first snapshot (an empty tree).
    fn window(&self, from: Option<SnapshotId>, to: SnapshotId) -> Result<(Option<usize>, usize)> {
        let to_idx = self.index_of(to)?;
        let from_idx = from.map(|id| self.index_of(id)).transpose()?;
        if let Some(from_idx) = from_idx {
            if from_idx > to_idx {
                return Err(Error::NotAnAncestor {
                    history: self.name.clone(),
                    from: self.snapshots[from_idx].id,
                    to,
                });
            }
        }
        Ok((from_idx, to_idx))
    }

    /// Net changes between two snapshots, with the tree of `to`.
    pub fn diff(&self, from: Option<SnapshotId>, to: SnapshotId) -> Result<FileSystemDiff> {
        let (from_idx, to_idx) = self.window(from, to)?;
        let empty = Directory::root();
        let from_tree = from_idx.map_or(&empty, |idx| &self.snapshots[idx].root);
        let to_tree = &self.snapshots[to_idx].root;

        let changes = diff_trees(from_tree, to_tree, self.equality.as_ref(), None)?;
        Ok(FileSystemDiff::new(self.name.clone(), to_tree.clone(), changes)
            .between_snapshots(from, to))
    }

    /// Chronological change lists per path between two snapshots.
    ///
    /// Each step between consecutive snapshots contributes at most one
    /// change per path. `paths` restricts the result to the given paths.
    pub fn change_lists(
        &self,
        from: Option<SnapshotId>,
        to: SnapshotId,
        paths: Option<&[FilePath]>,
    ) -> Result<Vec<ChangeList>> {
        let (from_idx, to_idx) = self.window(from, to)?;
        let empty = Directory::root();

        let mut previous = from_idx.map_or(&empty, |idx| &self.snapshots[idx].root);
        let start = from_idx.map_or(0, |idx| idx + 1);

        let mut by_path: BTreeMap<FilePath, Vec<Change>> = BTreeMap::new();
        for snapshot in &self.snapshots[start..=to_idx] {
            for change in diff_trees(previous, &snapshot.root, self.equality.as_ref(), paths)? {
                by_path.entry(change.path().clone()).or_default().push(change);
            }
            previous = &snapshot.root;
        }

        by_path.into_values().map(ChangeList::new).collect()
    }
}

/// Changes that turn `from` into `to`, one per path, ordered by path.
///
/// Files present in both trees produce a modification only if `equality`
/// considers them different. `paths` restricts the comparison.
pub fn diff_trees(
    from: &Directory,
    to: &Directory,
    equality: &dyn FileEquality,
    paths: Option<&[FilePath]>,
) -> Result<Vec<Change>> {
    let candidates: BTreeSet<FilePath> = match paths {
        Some(paths) => paths.iter().cloned().collect(),
        None => from
            .all_files()
            .into_iter()
            .chain(to.all_files())
            .map(|f| f.path.clone())
            .collect(),
    };

    let mut changes = Vec::new();
    for path in candidates {
        let old = from.get_file(&path);
        let new = to.get_file(&path);
        if equality.equals_opt(old, new) {
            continue;
        }
        changes.extend(Change::between(old.cloned(), new.cloned())?);
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChangeType, DiffSource, FileReference, MetadataEquality};

    fn path(p: &str) -> FilePath {
        FilePath::parse(p).unwrap()
    }

    fn file(p: &str, time: u64) -> FileReference {
        FileReference::new(path(p), time, 1)
    }

    fn history() -> History {
        History::new("laptop", Arc::new(MetadataEquality))
    }

    #[test]
    fn snapshots_are_linear() {
        let mut history = history();
        assert_eq!(history.latest_snapshot_id(), None);

        let first = history.add_snapshot(Directory::root());
        let second = history.add_snapshot(Directory::from_files(vec![file("/a", 1)]).unwrap());

        assert_eq!(first, SnapshotId(1));
        assert_eq!(history.get_snapshot(second).unwrap().parent(), Some(first));
        assert_eq!(history.latest_snapshot_id(), Some(second));
        assert_eq!(history.snapshots().len(), 2);
        assert!(matches!(
            history.get_snapshot(SnapshotId(9)),
            Err(Error::SnapshotNotFound { .. })
        ));
    }

    #[test]
    fn diff_trees_detects_all_change_types() {
        let from =
            Directory::from_files(vec![file("/keep", 1), file("/mod", 1), file("/del", 1)]).unwrap();
        let to =
            Directory::from_files(vec![file("/keep", 1), file("/mod", 2), file("/add", 1)]).unwrap();

        let changes = diff_trees(&from, &to, &MetadataEquality, None).unwrap();
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.path().to_string(), c.change_type()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/add".to_string(), ChangeType::Added),
                ("/del".to_string(), ChangeType::Deleted),
                ("/mod".to_string(), ChangeType::Modified),
            ]
        );
    }

    #[test]
    fn diff_trees_restricted_to_paths() {
        let from = Directory::from_files(vec![file("/a", 1), file("/b", 1)]).unwrap();
        let to = Directory::from_files(vec![file("/a", 2), file("/b", 2)]).unwrap();

        let changes = diff_trees(&from, &to, &MetadataEquality, Some(&[path("/B")])).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path().as_str(), "/b");
    }

    #[test]
    fn diff_between_snapshots() {
        let mut history = history();
        let s1 = history.add_snapshot(Directory::from_files(vec![file("/a", 1)]).unwrap());
        history.add_snapshot(Directory::from_files(vec![file("/a", 2)]).unwrap());
        let s3 = history
            .add_snapshot(Directory::from_files(vec![file("/a", 3), file("/b", 1)]).unwrap());

        let diff = history.diff(Some(s1), s3).unwrap();
        assert_eq!(diff.history_name(), "laptop");
        assert_eq!(diff.changes().len(), 2);
        assert_eq!(diff.from_snapshot(), Some(s1));
        assert_eq!(diff.to_snapshot(), Some(s3));
        assert!(diff.root_directory().file_exists(&path("/b")));

        // From the beginning everything is an addition
        let initial = history.diff(None, s3).unwrap();
        assert!(initial
            .changes()
            .iter()
            .all(|c| c.change_type() == ChangeType::Added));
    }

    #[test]
    fn diff_rejects_reversed_window() {
        let mut history = history();
        let s1 = history.add_snapshot(Directory::root());
        let s2 = history.add_snapshot(Directory::root());

        assert!(matches!(
            history.diff(Some(s2), s1),
            Err(Error::NotAnAncestor { .. })
        ));
    }

    #[test]
    fn change_lists_keep_every_step() {
        let mut history = history();
        let s1 = history.add_snapshot(Directory::from_files(vec![file("/a", 1)]).unwrap());
        history.add_snapshot(Directory::from_files(vec![file("/a", 2), file("/tmp", 1)]).unwrap());
        let s3 = history.add_snapshot(Directory::from_files(vec![file("/a", 3)]).unwrap());

        let lists = history.change_lists(Some(s1), s3, None).unwrap();
        assert_eq!(lists.len(), 2);

        let a = &lists[0];
        assert_eq!(a.path().as_str(), "/a");
        assert_eq!(a.len(), 2);
        assert_eq!(a.first().from_version().unwrap().last_write_time, Some(1));
        assert_eq!(a.last().to_version().unwrap().last_write_time, Some(3));

        let tmp = &lists[1];
        assert_eq!(tmp.changes().len(), 2);
        assert_eq!(tmp.net_change(), None);

        let only_a = history.change_lists(Some(s1), s3, Some(&[path("/a")])).unwrap();
        assert_eq!(only_a.len(), 1);

        assert!(history.change_lists(Some(s3), s3, None).unwrap().is_empty());
    }
}
