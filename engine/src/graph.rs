//! Version graphs for N-way conflict resolution.
//!
//! A [`ChangeGraph`] collects every version of one path that any history
//! has seen since a conflict was recorded. Nodes are file versions (with
//! `None` standing for "does not exist"), deduplicated through the equality
//! oracle. Edges are the transitions histories made between them.
//!
//! Each history also marks the version it currently holds as a lineage
//! end. A sink is a lineage end that no other lineage end lies strictly
//! downstream of. A history that reverted its file therefore keeps its
//! current version as a sink even though the graph has a cycle through it.

use crate::{Change, ChangeList, FileEquality, FilePath, FileReference};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// Index of a node in a [`ChangeGraph`].
pub type NodeId = usize;

/// Directed graph of the versions of a single path.
#[derive(Debug, Clone)]
pub struct ChangeGraph {
    path: FilePath,
    equality: Arc<dyn FileEquality>,
    nodes: Vec<Option<FileReference>>,
    edges: BTreeSet<(NodeId, NodeId)>,
    ends: BTreeSet<NodeId>,
}

impl ChangeGraph {
    pub fn new(path: FilePath, equality: Arc<dyn FileEquality>) -> Self {
        Self {
            path,
            equality,
            nodes: Vec::new(),
            edges: BTreeSet::new(),
            ends: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// Add a version, returning the id of an existing equal node if there
    /// is one.
    pub fn add_node(&mut self, version: Option<FileReference>) -> NodeId {
        if let Some(id) = self.find_node(version.as_ref()) {
            return id;
        }
        self.nodes.push(version);
        self.nodes.len() - 1
    }

    /// Record a transition. Transitions between equal versions add the node
    /// but no edge.
    pub fn add_edge(&mut self, from: Option<FileReference>, to: Option<FileReference>) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if from != to {
            self.edges.insert((from, to));
        }
    }

    /// Mark `version` as the one a lineage currently holds.
    pub fn add_lineage_end(&mut self, version: Option<FileReference>) -> NodeId {
        let id = self.add_node(version);
        self.ends.insert(id);
        id
    }

    pub fn add_change(&mut self, change: &Change) {
        self.add_edge(change.from_version().cloned(), change.to_version().cloned());
    }

    pub fn add_change_list(&mut self, list: &ChangeList) {
        for change in list.changes() {
            self.add_change(change);
        }
    }

    pub fn find_node(&self, version: Option<&FileReference>) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| self.equality.equals_opt(node.as_ref(), version))
    }

    pub fn node(&self, id: NodeId) -> Option<Option<&FileReference>> {
        self.nodes.get(id).map(Option::as_ref)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .range((id, 0)..=(id, NodeId::MAX))
            .map(|&(_, to)| to)
    }

    /// Nodes marked as lineage ends. Without any marks, every node with no
    /// outgoing transition counts as one.
    pub fn lineage_ends(&self) -> Vec<NodeId> {
        if self.ends.is_empty() {
            (0..self.nodes.len())
                .filter(|&id| self.successors(id).next().is_none())
                .collect()
        } else {
            self.ends.iter().copied().collect()
        }
    }

    /// Whether `to` can be reached from `from` by following transitions.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            if id == to {
                return true;
            }
            for next in self.successors(id) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    fn supersedes(&self, later: NodeId, earlier: NodeId) -> bool {
        later != earlier && self.reaches(earlier, later) && !self.reaches(later, earlier)
    }

    /// Lineage ends no other lineage end has moved past, in insertion order.
    ///
    /// An end is superseded when another end is reachable from it but not
    /// the other way round. Ends on a common cycle supersede each other
    /// neither way and all remain.
    pub fn sinks(&self) -> Vec<Option<&FileReference>> {
        let ends = self.lineage_ends();
        ends.iter()
            .copied()
            .filter(|&end| !ends.iter().any(|&other| self.supersedes(other, end)))
            .map(|id| self.nodes[id].as_ref())
            .collect()
    }
}
