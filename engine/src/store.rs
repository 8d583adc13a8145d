//! Conflict store - persistent record of open and resolved conflicts.
//!
//! A conflict remembers, for every participating history, which snapshot
//! was latest when it was recorded. Resolution passes read the open
//! conflicts and hand back a single [`StoreUpdate`] that the store applies
//! as a unit.

use crate::{
    error::Result, Change, Error, FilePath, FileReference, History, SnapshotId, SyncConflict,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use uuid::Uuid;

/// Version of the persisted conflict store format.
pub const CONFLICT_STORE_FORMAT_VERSION: u32 = 1;

/// Unique identifier of a recorded conflict.
pub type ConflictId = String;

/// An open conflict for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub id: ConflictId,
    pub path: FilePath,
    /// Latest snapshot of each history at the time the conflict was
    /// recorded; `None` if the history had no snapshot yet
    pub snapshot_ids: BTreeMap<String, Option<SnapshotId>>,
    /// The synchronization conflict that caused this record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<SyncConflict>,
}

impl ConflictInfo {
    pub fn new(path: FilePath, snapshot_ids: BTreeMap<String, Option<SnapshotId>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path,
            snapshot_ids,
            conflict: None,
        }
    }

    /// Capture the current state of `histories` for `path`.
    pub fn capture<'a>(path: FilePath, histories: impl IntoIterator<Item = &'a History>) -> Self {
        let snapshot_ids = histories
            .into_iter()
            .map(|h| (h.name().to_string(), h.latest_snapshot_id()))
            .collect();
        Self::new(path, snapshot_ids)
    }

    pub fn with_conflict(mut self, conflict: SyncConflict) -> Self {
        self.conflict = Some(conflict);
        self
    }
}

/// A conflict that was settled, with the version every history converges on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConflict {
    pub conflict: ConflictInfo,
    /// `None` means the file ends up deleted
    pub version: Option<FileReference>,
}

/// A change one history must make to reach a resolved version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionAction {
    pub history: String,
    pub change: Change,
}

/// An immutable batch of store mutations.
///
/// Build one with [`StoreUpdate::builder`]; it cannot be changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreUpdate {
    removed: Vec<ConflictId>,
    resolved: Vec<ResolvedConflict>,
    actions: Vec<ResolutionAction>,
}

impl StoreUpdate {
    pub fn builder() -> StoreUpdateBuilder {
        StoreUpdateBuilder::default()
    }

    /// Conflict ids to remove from the open set.
    pub fn removed(&self) -> &[ConflictId] {
        &self.removed
    }

    pub fn resolved(&self) -> &[ResolvedConflict] {
        &self.resolved
    }

    pub fn actions(&self) -> &[ResolutionAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.resolved.is_empty() && self.actions.is_empty()
    }
}

/// Accumulates mutations for a [`StoreUpdate`].
#[derive(Debug, Default)]
pub struct StoreUpdateBuilder {
    update: StoreUpdate,
}

impl StoreUpdateBuilder {
    /// Close a conflict without recording a resolution.
    pub fn remove(mut self, id: impl Into<ConflictId>) -> Self {
        self.update.removed.push(id.into());
        self
    }

    /// Close a conflict with the version it resolved to and the changes
    /// histories must make to reach it.
    pub fn resolve(
        mut self,
        conflict: ConflictInfo,
        version: Option<FileReference>,
        actions: impl IntoIterator<Item = ResolutionAction>,
    ) -> Self {
        self.update.removed.push(conflict.id.clone());
        self.update.resolved.push(ResolvedConflict { conflict, version });
        self.update.actions.extend(actions);
        self
    }

    pub fn build(self) -> StoreUpdate {
        self.update
    }
}

/// Storage for conflicts awaiting resolution.
pub trait ConflictStore {
    /// All open conflicts, ordered by path.
    fn conflicts(&self) -> Result<Vec<ConflictInfo>>;

    /// Apply a batch of mutations. Either all of it takes effect or none.
    fn apply(&mut self, update: StoreUpdate) -> Result<()>;
}

/// Conflict store kept in memory, persistable as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryConflictStore {
    conflicts: BTreeMap<ConflictId, ConflictInfo>,
    resolved: Vec<ResolvedConflict>,
    pending_actions: Vec<ResolutionAction>,
}

impl InMemoryConflictStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open conflict and return its id.
    pub fn add_conflict(&mut self, conflict: ConflictInfo) -> ConflictId {
        let id = conflict.id.clone();
        debug!(conflict = %id, path = %conflict.path, "conflict recorded");
        self.conflicts.insert(id.clone(), conflict);
        id
    }

    /// Record a synchronization conflict against the current state of
    /// `histories`. Returns `None` for conflicts without a path.
    pub fn record<'a>(
        &mut self,
        conflict: &SyncConflict,
        histories: impl IntoIterator<Item = &'a History>,
    ) -> Option<ConflictId> {
        let path = conflict.path()?.clone();
        let info = ConflictInfo::capture(path, histories).with_conflict(conflict.clone());
        Some(self.add_conflict(info))
    }

    pub fn get(&self, id: &str) -> Option<&ConflictInfo> {
        self.conflicts.get(id)
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Every conflict resolved so far, oldest first.
    pub fn resolved(&self) -> &[ResolvedConflict] {
        &self.resolved
    }

    /// Changes histories still have to make.
    pub fn pending_actions(&self) -> &[ResolutionAction] {
        &self.pending_actions
    }

    /// Hand pending actions to the caller, clearing them from the store.
    pub fn take_pending_actions(&mut self) -> Vec<ResolutionAction> {
        std::mem::take(&mut self.pending_actions)
    }

    pub fn to_snapshot(&self) -> ConflictStoreSnapshot {
        ConflictStoreSnapshot {
            format_version: CONFLICT_STORE_FORMAT_VERSION,
            conflicts: self.conflicts.values().cloned().collect(),
            resolved: self.resolved.clone(),
            pending_actions: self.pending_actions.clone(),
        }
    }

    pub fn from_snapshot(snapshot: ConflictStoreSnapshot) -> Result<Self> {
        let mut conflicts = BTreeMap::new();
        for conflict in snapshot.conflicts {
            let id = conflict.id.clone();
            if conflicts.insert(id.clone(), conflict).is_some() {
                return Err(Error::InvalidStoreSnapshot(format!(
                    "duplicate conflict id: {}",
                    id
                )));
            }
        }
        Ok(Self {
            conflicts,
            resolved: snapshot.resolved,
            pending_actions: snapshot.pending_actions,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_snapshot().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(ConflictStoreSnapshot::from_json(json)?)
    }
}

impl ConflictStore for InMemoryConflictStore {
    fn conflicts(&self) -> Result<Vec<ConflictInfo>> {
        let mut conflicts: Vec<_> = self.conflicts.values().cloned().collect();
        conflicts.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
        Ok(conflicts)
    }

    fn apply(&mut self, update: StoreUpdate) -> Result<()> {
        // Validate before touching anything
        let mut seen = BTreeSet::new();
        for id in &update.removed {
            if !self.conflicts.contains_key(id) || !seen.insert(id) {
                return Err(Error::ConflictNotFound(id.clone()));
            }
        }

        for id in &update.removed {
            self.conflicts.remove(id);
        }
        self.resolved.extend(update.resolved);
        self.pending_actions.extend(update.actions);

        debug!(
            removed = update.removed.len(),
            open = self.conflicts.len(),
            "conflict store updated"
        );
        Ok(())
    }
}

/// Persisted form of an [`InMemoryConflictStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictStoreSnapshot {
    pub format_version: u32,
    /// Open conflicts ordered by id
    pub conflicts: Vec<ConflictInfo>,
    pub resolved: Vec<ResolvedConflict>,
    pub pending_actions: Vec<ResolutionAction>,
}

impl ConflictStoreSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidStoreSnapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidStoreSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidStoreSnapshot(e.to_string()))?;

        if snapshot.format_version > CONFLICT_STORE_FORMAT_VERSION {
            return Err(Error::InvalidStoreSnapshot(format!(
                "unsupported format version: {} (max supported: {})",
                snapshot.format_version, CONFLICT_STORE_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Directory, MetadataEquality};
    use std::sync::Arc;

    fn path(p: &str) -> FilePath {
        FilePath::parse(p).unwrap()
    }

    fn file(p: &str, time: u64) -> FileReference {
        FileReference::new(path(p), time, 1)
    }

    fn conflict(p: &str) -> ConflictInfo {
        ConflictInfo::new(path(p), BTreeMap::from([("left".to_string(), Some(SnapshotId(1)))]))
    }

    #[test]
    fn conflict_ids_are_unique() {
        assert_ne!(conflict("/a").id, conflict("/a").id);
    }

    #[test]
    fn capture_records_latest_snapshots() {
        let mut laptop = History::new("laptop", Arc::new(MetadataEquality));
        laptop.add_snapshot(Directory::root());
        let desktop = History::new("desktop", Arc::new(MetadataEquality));

        let info = ConflictInfo::capture(path("/a"), [&laptop, &desktop]);
        assert_eq!(info.snapshot_ids["laptop"], Some(SnapshotId(1)));
        assert_eq!(info.snapshot_ids["desktop"], None);
    }

    #[test]
    fn record_sync_conflict() {
        let laptop = History::new("laptop", Arc::new(MetadataEquality));
        let mut store = InMemoryConflictStore::new();
        let sync_conflict = SyncConflict::modification_deletion(file("/a", 2), file("/a", 1));

        let id = store.record(&sync_conflict, [&laptop]).unwrap();
        let info = store.get(&id).unwrap();
        assert_eq!(info.path, path("/a"));
        assert_eq!(info.conflict.as_ref(), Some(&sync_conflict));
    }

    #[test]
    fn conflicts_ordered_by_path() {
        let mut store = InMemoryConflictStore::new();
        store.add_conflict(conflict("/b"));
        store.add_conflict(conflict("/a"));

        let paths: Vec<_> = store
            .conflicts()
            .unwrap()
            .into_iter()
            .map(|c| c.path.to_string())
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn apply_resolution() {
        let mut store = InMemoryConflictStore::new();
        let info = conflict("/a");
        let id = store.add_conflict(info.clone());
        store.add_conflict(conflict("/b"));

        let update = StoreUpdate::builder()
            .resolve(
                info,
                Some(file("/a", 2)),
                vec![ResolutionAction {
                    history: "left".into(),
                    change: Change::modified(file("/a", 1), file("/a", 2)).unwrap(),
                }],
            )
            .build();
        assert_eq!(update.removed(), &[id.clone()]);

        store.apply(update).unwrap();
        assert!(store.get(&id).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.resolved().len(), 1);
        assert_eq!(store.pending_actions().len(), 1);

        assert_eq!(store.take_pending_actions().len(), 1);
        assert!(store.pending_actions().is_empty());
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut store = InMemoryConflictStore::new();
        let id = store.add_conflict(conflict("/a"));

        let update = StoreUpdate::builder()
            .remove(id.clone())
            .remove("missing")
            .build();
        assert_eq!(
            store.apply(update),
            Err(Error::ConflictNotFound("missing".into()))
        );
        assert!(store.get(&id).is_some());

        let twice = StoreUpdate::builder().remove(id.clone()).remove(id.clone()).build();
        assert!(store.apply(twice).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn json_persistence() {
        let mut store = InMemoryConflictStore::new();
        store.add_conflict(conflict("/a"));
        let info = conflict("/b");
        store.add_conflict(info.clone());
        store
            .apply(
                StoreUpdate::builder()
                    .resolve(
                        info,
                        None,
                        vec![ResolutionAction {
                            history: "left".into(),
                            change: Change::deleted(file("/b", 1)),
                        }],
                    )
                    .build(),
            )
            .unwrap();

        let json = store.to_json().unwrap();
        let restored = InMemoryConflictStore::from_json(&json).unwrap();
        assert_eq!(restored, store);
        assert_eq!(
            restored.pending_actions()[0].change.path(),
            &path("/b")
        );
    }

    #[test]
    fn rejects_future_format_version() {
        let mut snapshot = InMemoryConflictStore::new().to_snapshot();
        snapshot.format_version = CONFLICT_STORE_FORMAT_VERSION + 1;
        let json = snapshot.to_json_pretty().unwrap();

        assert!(matches!(
            InMemoryConflictStore::from_json(&json),
            Err(Error::InvalidStoreSnapshot(_))
        ));
        assert!(InMemoryConflictStore::from_json("not json").is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let info = conflict("/a");
        let snapshot = ConflictStoreSnapshot {
            format_version: CONFLICT_STORE_FORMAT_VERSION,
            conflicts: vec![info.clone(), info],
            resolved: Vec::new(),
            pending_actions: Vec::new(),
        };
        assert!(InMemoryConflictStore::from_snapshot(snapshot).is_err());
    }
}
