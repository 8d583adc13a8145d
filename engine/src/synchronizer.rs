//! Two-way reconciliation of file changes.
//!
//! Given the diffs of two participants observing the same logical folder,
//! the [`Synchronizer`] decides for every affected path whether nothing needs
//! to happen, one side needs an action to catch up, or the path is in
//! conflict.
//!
//! # Algorithm
//!
//! 1. Drop irrelevant changes from both diffs ([`FilteredDiff`])
//! 2. Pair the remaining changes by path ([`group_changes`])
//! 3. For each pair, decide an [`Outcome`]:
//!    - one side changed: compare against the other side's current tree
//!    - both sides changed: compare the two changes with each other
//! 4. Collect actions and conflicts into a [`SynchronizationResult`]
//!
//! Pairs that cannot arise from well-formed diffs (e.g. an addition on one
//! side and a deletion on the other) abort the pass with an error.

use crate::{
    error::Result, group_changes, Change, ChangeType, DiffSource, Directory, Error, FileEquality,
    FileReference, FilteredDiff, GroupedChange, PathFilter, SyncAction, SyncConflict,
    SyncParticipant, SynchronizationResult,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Decision for a single grouped change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Both sides already agree
    NoOp,
    /// One side must be updated
    Action(SyncAction),
    /// Needs external resolution
    Conflict(SyncConflict),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoOp => f.write_str("no-op"),
            Outcome::Action(action) => write!(f, "{action}"),
            Outcome::Conflict(conflict) => write!(f, "conflict: {conflict}"),
        }
    }
}

/// The reconciliation engine.
///
/// Holds no per-pass state, so one instance can serve any number of
/// independent passes, including concurrent ones.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    equality: Arc<dyn FileEquality>,
    filter: PathFilter,
}

impl Synchronizer {
    /// Create a synchronizer using `equality` for every version comparison.
    pub fn new(equality: Arc<dyn FileEquality>) -> Self {
        Self {
            equality,
            filter: PathFilter::new(),
        }
    }

    /// Exclude paths from synchronization.
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn equality(&self) -> &dyn FileEquality {
        self.equality.as_ref()
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Reconcile two diffs.
    ///
    /// Returns the actions that bring both sides to a consistent state and
    /// the conflicts that block it. Fails if the diffs violate an invariant.
    pub fn synchronize(
        &self,
        left: &dyn DiffSource,
        right: &dyn DiffSource,
    ) -> Result<SynchronizationResult> {
        let left = FilteredDiff::new(left, &self.filter, self.equality());
        let right = FilteredDiff::new(right, &self.filter, self.equality());

        let grouped = group_changes(
            left.changes().iter().cloned(),
            right.changes().iter().cloned(),
        )?;

        let mut result = SynchronizationResult::new();
        for change in &grouped {
            let outcome = self.process(change, left.root_directory(), right.root_directory())?;
            debug!(path = %change.path(), %outcome, "reconciled path");

            match outcome {
                Outcome::NoOp => {}
                Outcome::Action(action) => result.add_action(action),
                Outcome::Conflict(conflict) => {
                    warn!(path = %change.path(), %conflict, "sync conflict");
                    result.add_conflict(conflict);
                }
            }
        }

        info!(
            left = left.history_name(),
            right = right.history_name(),
            paths = grouped.len(),
            filtered = left.dropped() + right.dropped(),
            actions = result.actions.len(),
            conflicts = result.conflicts.len(),
            "synchronization finished"
        );

        Ok(result)
    }

    /// Decide the outcome for one grouped change.
    ///
    /// `left_tree` and `right_tree` are the current trees of both sides;
    /// they are only consulted when one side did not change the path.
    pub fn process(
        &self,
        change: &GroupedChange,
        left_tree: &Directory,
        right_tree: &Directory,
    ) -> Result<Outcome> {
        match (change.left(), change.right()) {
            (Some(left), None) => self.process_single(left, right_tree, SyncParticipant::Right),
            (None, Some(right)) => self.process_single(right, left_tree, SyncParticipant::Left),
            (Some(left), Some(right)) => self.process_double(left, right),
            (None, None) => Err(Error::EmptyGroupedChange),
        }
    }

    /// Only one side changed: bring `target`, whose tree is `unchanged`,
    /// up to date.
    fn process_single(
        &self,
        changed: &Change,
        unchanged: &Directory,
        target: SyncParticipant,
    ) -> Result<Outcome> {
        let eq = self.equality();
        let existing = unchanged.get_file(changed.path());

        let outcome = match changed.change_type() {
            ChangeType::Added => {
                let added = required(changed.to_version(), changed)?;
                match existing {
                    Some(existing) if eq.equals(existing, added) => Outcome::NoOp,
                    Some(existing) => Outcome::Conflict(SyncConflict::multiple_versions([
                        existing.clone(),
                        added.clone(),
                    ])),
                    None => Outcome::Action(SyncAction::add(target, added.clone())),
                }
            }
            ChangeType::Deleted => {
                let deleted = required(changed.from_version(), changed)?;
                match existing {
                    None => Outcome::NoOp,
                    Some(existing) if eq.equals(existing, deleted) => {
                        Outcome::Action(SyncAction::remove(target, existing.clone()))
                    }
                    Some(existing) => Outcome::Conflict(SyncConflict::multiple_versions([
                        existing.clone(),
                        deleted.clone(),
                    ])),
                }
            }
            ChangeType::Modified => {
                let from = required(changed.from_version(), changed)?;
                let to = required(changed.to_version(), changed)?;
                let Some(existing) = existing else {
                    return Err(fatal(Error::ModifiedFileMissing(changed.path().clone())));
                };

                if eq.equals(existing, to) {
                    Outcome::NoOp
                } else if eq.equals(existing, from) {
                    Outcome::Action(SyncAction::replace(target, existing.clone(), to.clone()))
                } else {
                    Outcome::Conflict(SyncConflict::multiple_versions([
                        existing.clone(),
                        to.clone(),
                    ]))
                }
            }
        };

        Ok(outcome)
    }

    /// Both sides changed the same path.
    fn process_double(&self, left: &Change, right: &Change) -> Result<Outcome> {
        use ChangeType::{Added, Deleted, Modified};
        use SyncParticipant::{Left, Right};

        match (left.change_type(), right.change_type()) {
            (Added, Deleted) | (Deleted, Added) => {
                Err(fatal(Error::AddedAndDeleted(left.path().clone())))
            }
            (Added, Added) => {
                let l = required(left.to_version(), left)?;
                let r = required(right.to_version(), right)?;
                if self.equality().equals(l, r) {
                    Ok(Outcome::NoOp)
                } else {
                    Ok(Outcome::Conflict(SyncConflict::multiple_versions([
                        l.clone(),
                        r.clone(),
                    ])))
                }
            }
            (Added, Modified) => self.process_added_modified(left, Left, right),
            (Modified, Added) => self.process_added_modified(right, Right, left),
            (Modified, Modified) => self.process_modified_modified(left, right),
            (Modified, Deleted) => self.process_modified_deleted(left, Left, right),
            (Deleted, Modified) => self.process_modified_deleted(right, Right, left),
            (Deleted, Deleted) => Ok(Outcome::NoOp),
        }
    }

    fn process_added_modified(
        &self,
        added: &Change,
        added_side: SyncParticipant,
        modified: &Change,
    ) -> Result<Outcome> {
        let eq = self.equality();
        let added_version = required(added.to_version(), added)?;
        let from = required(modified.from_version(), modified)?;
        let to = required(modified.to_version(), modified)?;

        if eq.equals(added_version, to) {
            Ok(Outcome::NoOp)
        } else if eq.equals(added_version, from) {
            // The addition is the state the modification started from
            Ok(Outcome::Action(SyncAction::replace(
                added_side,
                added_version.clone(),
                to.clone(),
            )))
        } else {
            Ok(Outcome::Conflict(SyncConflict::multiple_versions([
                added_version.clone(),
                to.clone(),
            ])))
        }
    }

    fn process_modified_modified(&self, left: &Change, right: &Change) -> Result<Outcome> {
        let eq = self.equality();
        let left_from = required(left.from_version(), left)?;
        let left_to = required(left.to_version(), left)?;
        let right_from = required(right.from_version(), right)?;
        let right_to = required(right.to_version(), right)?;

        if eq.equals(left_to, right_to) {
            Ok(Outcome::NoOp)
        } else if eq.equals(left_to, right_from) {
            // Right continued from where left ended
            Ok(Outcome::Action(SyncAction::replace(
                SyncParticipant::Left,
                right_from.clone(),
                right_to.clone(),
            )))
        } else if eq.equals(right_to, left_from) {
            Ok(Outcome::Action(SyncAction::replace(
                SyncParticipant::Right,
                left_from.clone(),
                left_to.clone(),
            )))
        } else if eq.equals(left_from, right_from) {
            Ok(Outcome::Conflict(SyncConflict::multiple_versions([
                left_to.clone(),
                right_to.clone(),
            ])))
        } else {
            Err(fatal(Error::NoCommonBaseVersion(left.path().clone())))
        }
    }

    fn process_modified_deleted(
        &self,
        modified: &Change,
        modified_side: SyncParticipant,
        deleted: &Change,
    ) -> Result<Outcome> {
        let eq = self.equality();
        let mod_from = required(modified.from_version(), modified)?;
        let mod_to = required(modified.to_version(), modified)?;
        let del_from = required(deleted.from_version(), deleted)?;

        if eq.equals(mod_from, del_from) {
            Ok(Outcome::Conflict(SyncConflict::modification_deletion(
                mod_to.clone(),
                del_from.clone(),
            )))
        } else if eq.equals(mod_to, del_from) {
            // The deletion happened after the modification was already seen
            Ok(Outcome::Action(SyncAction::remove(
                modified_side,
                mod_to.clone(),
            )))
        } else {
            Err(fatal(Error::NoCommonDeletionVersion(modified.path().clone())))
        }
    }
}

fn required<'c>(version: Option<&'c FileReference>, change: &Change) -> Result<&'c FileReference> {
    version.ok_or_else(|| Error::InvalidChange {
        change_type: change.change_type(),
        path: change.path().to_string(),
        reason: "missing file version".to_string(),
    })
}

fn fatal(err: Error) -> Error {
    error!(%err, "reconciliation aborted");
    err
}
