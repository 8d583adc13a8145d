//! N-way conflict resolution.
//!
//! For every open conflict a [`ChangeGraph`] is built from what each
//! participating history did to the path since the conflict was recorded.
//! A [`ConflictResolver`] then picks the version all histories should
//! converge on, or leaves the conflict open.
//!
//! A pass reads the store, computes every outcome without side effects,
//! and writes one [`StoreUpdate`] back. The store is borrowed mutably for
//! the whole pass, so passes against the same store never interleave.

use crate::{
    error::Result, Change, ChangeGraph, ConflictId, ConflictInfo, ConflictStore, Error,
    FileEquality, FileReference, History, ResolutionAction, StoreUpdate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::slice;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of resolving one change graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every history should end up with this version (`None` = deleted)
    Resolved(Option<FileReference>),
    Unresolved,
}

/// Chooses a winning version from a change graph.
pub trait ConflictResolver: Debug + Send + Sync {
    fn resolve(&self, graph: &ChangeGraph) -> Resolution;
}

/// Resolves only when the graph has exactly one sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimpleConflictResolver;

impl ConflictResolver for SimpleConflictResolver {
    fn resolve(&self, graph: &ChangeGraph) -> Resolution {
        match graph.sinks().as_slice() {
            [sink] => Resolution::Resolved(sink.cloned()),
            _ => Resolution::Unresolved,
        }
    }
}

/// Like [`SimpleConflictResolver`], but with several sinks picks the one
/// with the strictly latest write time.
///
/// Ties, deletions and versions without a timestamp leave the conflict
/// open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatestWriteTimeResolver;

impl ConflictResolver for LatestWriteTimeResolver {
    fn resolve(&self, graph: &ChangeGraph) -> Resolution {
        let sinks = graph.sinks();
        if let [sink] = sinks.as_slice() {
            return Resolution::Resolved(sink.cloned());
        }
        if sinks.is_empty() {
            return Resolution::Unresolved;
        }

        let mut times = Vec::with_capacity(sinks.len());
        for sink in &sinks {
            match sink.and_then(|f| f.last_write_time) {
                Some(time) => times.push(time),
                None => return Resolution::Unresolved,
            }
        }

        let Some(&latest) = times.iter().max() else {
            return Resolution::Unresolved;
        };
        let mut winners = sinks.iter().zip(&times).filter(|(_, t)| **t == latest);
        match (winners.next(), winners.next()) {
            (Some((winner, _)), None) => Resolution::Resolved(winner.cloned()),
            _ => Resolution::Unresolved,
        }
    }
}

/// Built-in resolver selection, used by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPolicy {
    /// Resolve only unambiguous outcomes (default)
    #[default]
    UniqueSink,
    /// Fall back to the latest write time between competing versions
    LatestWriteTime,
}

impl ResolutionPolicy {
    pub fn build(self) -> Arc<dyn ConflictResolver> {
        match self {
            ResolutionPolicy::UniqueSink => Arc::new(SimpleConflictResolver),
            ResolutionPolicy::LatestWriteTime => Arc::new(LatestWriteTimeResolver),
        }
    }
}

/// Access to histories by name.
pub trait HistoryLookup {
    fn history(&self, name: &str) -> Option<&History>;
}

impl HistoryLookup for BTreeMap<String, History> {
    fn history(&self, name: &str) -> Option<&History> {
        self.get(name)
    }
}

impl HistoryLookup for HashMap<String, History> {
    fn history(&self, name: &str) -> Option<&History> {
        self.get(name)
    }
}

impl HistoryLookup for [History] {
    fn history(&self, name: &str) -> Option<&History> {
        self.iter().find(|h| h.name() == name)
    }
}

impl HistoryLookup for Vec<History> {
    fn history(&self, name: &str) -> Option<&History> {
        self.as_slice().history(name)
    }
}

/// Summary of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: Vec<ConflictId>,
    pub still_open: Vec<ConflictId>,
    /// Number of changes histories must make
    pub actions: usize,
}

/// Resolves the open conflicts of a store against a set of histories.
#[derive(Debug, Clone)]
pub struct ConflictResolutionPass {
    resolver: Arc<dyn ConflictResolver>,
    equality: Arc<dyn FileEquality>,
}

impl ConflictResolutionPass {
    pub fn new(resolver: Arc<dyn ConflictResolver>, equality: Arc<dyn FileEquality>) -> Self {
        Self { resolver, equality }
    }

    /// Resolve what can be resolved and write the outcome to `store` in a
    /// single update.
    pub fn run(
        &self,
        store: &mut dyn ConflictStore,
        histories: &dyn HistoryLookup,
    ) -> Result<ResolutionReport> {
        let conflicts = store.conflicts()?;
        let (update, report) = self.plan(conflicts, histories)?;
        if !update.is_empty() {
            store.apply(update)?;
        }

        info!(
            resolved = report.resolved.len(),
            still_open = report.still_open.len(),
            actions = report.actions,
            "conflict resolution complete"
        );
        Ok(report)
    }

    /// Compute the update for `conflicts` without touching any store.
    pub fn plan(
        &self,
        conflicts: Vec<ConflictInfo>,
        histories: &dyn HistoryLookup,
    ) -> Result<(StoreUpdate, ResolutionReport)> {
        let mut builder = StoreUpdate::builder();
        let mut report = ResolutionReport::default();

        for conflict in conflicts {
            let graph = self.build_graph(&conflict, histories)?;
            match self.resolver.resolve(&graph) {
                Resolution::Resolved(version) => {
                    let actions = self.actions_for(&conflict, version.as_ref(), histories)?;
                    debug!(
                        conflict = %conflict.id,
                        path = %conflict.path,
                        actions = actions.len(),
                        "conflict resolved"
                    );
                    report.resolved.push(conflict.id.clone());
                    report.actions += actions.len();
                    builder = builder.resolve(conflict, version, actions);
                }
                Resolution::Unresolved => {
                    warn!(
                        conflict = %conflict.id,
                        path = %conflict.path,
                        candidates = graph.sinks().len(),
                        "conflict remains open"
                    );
                    report.still_open.push(conflict.id);
                }
            }
        }

        Ok((builder.build(), report))
    }

    /// Graph of everything the conflict's histories did to its path since
    /// the conflict was recorded, with each history's current version
    /// marked as its lineage end.
    pub fn build_graph(
        &self,
        conflict: &ConflictInfo,
        histories: &dyn HistoryLookup,
    ) -> Result<ChangeGraph> {
        let mut graph = ChangeGraph::new(conflict.path.clone(), Arc::clone(&self.equality));

        for (name, since) in &conflict.snapshot_ids {
            let history = lookup(histories, name)?;
            if let Some(latest) = history.latest_snapshot_id() {
                let paths = Some(slice::from_ref(&conflict.path));
                for list in &history.change_lists(*since, latest, paths)? {
                    graph.add_change_list(list);
                }
            }
            graph.add_lineage_end(current_version(history, conflict)?.cloned());
        }

        Ok(graph)
    }

    fn actions_for(
        &self,
        conflict: &ConflictInfo,
        resolved: Option<&FileReference>,
        histories: &dyn HistoryLookup,
    ) -> Result<Vec<ResolutionAction>> {
        let mut actions = Vec::new();
        for name in conflict.snapshot_ids.keys() {
            let current = current_version(lookup(histories, name)?, conflict)?;
            if self.equality.equals_opt(current, resolved) {
                continue;
            }
            if let Some(change) = Change::between(current.cloned(), resolved.cloned())? {
                actions.push(ResolutionAction {
                    history: name.clone(),
                    change,
                });
            }
        }
        Ok(actions)
    }
}

fn lookup<'a>(histories: &'a dyn HistoryLookup, name: &str) -> Result<&'a History> {
    histories
        .history(name)
        .ok_or_else(|| Error::HistoryNotFound(name.to_string()))
}

fn current_version<'a>(
    history: &'a History,
    conflict: &ConflictInfo,
) -> Result<Option<&'a FileReference>> {
    match history.latest_snapshot_id() {
        Some(id) => Ok(history.get_snapshot(id)?.root().get_file(&conflict.path)),
        None => Ok(None),
    }
}

/// Run one resolution pass with the given strategy.
pub fn resolve_conflicts(
    store: &mut dyn ConflictStore,
    histories: &dyn HistoryLookup,
    resolver: Arc<dyn ConflictResolver>,
    equality: Arc<dyn FileEquality>,
) -> Result<ResolutionReport> {
    ConflictResolutionPass::new(resolver, equality).run(store, histories)
}
