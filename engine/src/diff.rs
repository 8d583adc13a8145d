//! Diff sources - the per-participant input of a synchronization pass.

use crate::{Change, ChangeType, Directory, FileEquality, PathFilter, SnapshotId};

/// Changes one participant made within a comparison window, plus the tree
/// that resulted from them.
pub trait DiffSource {
    /// Name of the history (participant) this diff belongs to.
    fn history_name(&self) -> &str;

    /// All changes in the window, one per path.
    fn changes(&self) -> &[Change];

    /// Root directory of the snapshot at the end of the window.
    fn root_directory(&self) -> &Directory;
}

/// A computed diff between two snapshots of one history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemDiff {
    history_name: String,
    from_snapshot: Option<SnapshotId>,
    to_snapshot: Option<SnapshotId>,
    root: Directory,
    changes: Vec<Change>,
}

impl FileSystemDiff {
    /// Create a diff not tied to stored snapshots.
    pub fn new(history_name: impl Into<String>, root: Directory, changes: Vec<Change>) -> Self {
        Self {
            history_name: history_name.into(),
            from_snapshot: None,
            to_snapshot: None,
            root,
            changes,
        }
    }

    /// Record which snapshots the diff spans.
    pub fn between_snapshots(mut self, from: Option<SnapshotId>, to: SnapshotId) -> Self {
        self.from_snapshot = from;
        self.to_snapshot = Some(to);
        self
    }

    pub fn from_snapshot(&self) -> Option<SnapshotId> {
        self.from_snapshot
    }

    pub fn to_snapshot(&self) -> Option<SnapshotId> {
        self.to_snapshot
    }
}

impl DiffSource for FileSystemDiff {
    fn history_name(&self) -> &str {
        &self.history_name
    }

    fn changes(&self) -> &[Change] {
        &self.changes
    }

    fn root_directory(&self) -> &Directory {
        &self.root
    }
}

/// A view of another diff with irrelevant changes removed.
///
/// Dropped changes are those under an excluded path, and modifications
/// whose old and new versions are equal under the oracle.
#[derive(Debug)]
pub struct FilteredDiff<'a, D: DiffSource + ?Sized> {
    inner: &'a D,
    changes: Vec<Change>,
}

impl<'a, D: DiffSource + ?Sized> FilteredDiff<'a, D> {
    pub fn new(inner: &'a D, filter: &PathFilter, equality: &dyn FileEquality) -> Self {
        let changes = inner
            .changes()
            .iter()
            .filter(|change| !filter.is_excluded(change.path()))
            .filter(|change| !is_immaterial(change, equality))
            .cloned()
            .collect();
        Self { inner, changes }
    }

    /// Number of changes the filter removed.
    pub fn dropped(&self) -> usize {
        self.inner.changes().len() - self.changes.len()
    }
}

fn is_immaterial(change: &Change, equality: &dyn FileEquality) -> bool {
    change.change_type() == ChangeType::Modified
        && equality.equals_opt(change.from_version(), change.to_version())
}

impl<D: DiffSource + ?Sized> DiffSource for FilteredDiff<'_, D> {
    fn history_name(&self) -> &str {
        self.inner.history_name()
    }

    fn changes(&self) -> &[Change] {
        &self.changes
    }

    fn root_directory(&self) -> &Directory {
        self.inner.root_directory()
    }
}
