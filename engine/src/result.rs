//! Accumulated output of one reconciliation pass.

use crate::{
    error::Result, Directory, Error, FileEquality, SyncAction, SyncConflict, SyncParticipant,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Actions and conflicts produced by one synchronization pass.
///
/// No deduplication happens here; the synchronizer emits at most one
/// outcome per path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationResult {
    /// Actions in the order they were produced
    pub actions: Vec<SyncAction>,
    /// Paths that need external resolution
    pub conflicts: Vec<SyncConflict>,
}

impl SynchronizationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: SyncAction) {
        self.actions.push(action);
    }

    pub fn add_conflict(&mut self, conflict: SyncConflict) {
        self.conflicts.push(conflict);
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Nothing to do and nothing to resolve.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.conflicts.is_empty()
    }

    /// Actions aimed at one participant.
    pub fn actions_for(&self, target: SyncParticipant) -> impl Iterator<Item = &SyncAction> {
        self.actions.iter().filter(move |a| a.target() == target)
    }

    /// Apply every action targeting `target` to `tree` and return the new
    /// tree.
    ///
    /// Fails if conflicts are still open or if an action's precondition
    /// does not hold: an added file must not exist yet, and a removed or
    /// replaced file must exist and match the expected prior version. The
    /// input tree is never modified, so a failure leaves the caller with
    /// the original tree.
    pub fn apply_to(
        &self,
        tree: &Directory,
        target: SyncParticipant,
        equality: &dyn FileEquality,
    ) -> Result<Directory> {
        if self.has_conflicts() {
            return Err(Error::UnresolvedConflicts(self.conflicts.len()));
        }

        let mut tree = tree.clone();
        for action in self.actions_for(target) {
            Self::apply_action(&mut tree, action, equality)?;
            trace!(%action, "applied sync action");
        }
        Ok(tree)
    }

    fn apply_action(
        tree: &mut Directory,
        action: &SyncAction,
        equality: &dyn FileEquality,
    ) -> Result<()> {
        match action {
            SyncAction::AddFile { new_file, .. } => {
                if tree.file_exists(&new_file.path) {
                    return Err(Error::FileAlreadyExists(new_file.path.clone()));
                }
                tree.insert_file(new_file.clone())?;
            }
            SyncAction::RemoveFile { removed_file, .. } => {
                Self::check_current(tree, removed_file, equality)?;
                tree.remove_file(&removed_file.path);
            }
            SyncAction::ReplaceFile {
                old_version,
                new_version,
                ..
            } => {
                Self::check_current(tree, old_version, equality)?;
                tree.insert_file(new_version.clone())?;
            }
        }
        Ok(())
    }

    fn check_current(
        tree: &Directory,
        expected: &crate::FileReference,
        equality: &dyn FileEquality,
    ) -> Result<()> {
        match tree.get_file(&expected.path) {
            None => Err(Error::FileNotFound(expected.path.clone())),
            Some(current) if !equality.equals(current, expected) => {
                Err(Error::FileVersionMismatch(expected.path.clone()))
            }
            Some(_) => Ok(()),
        }
    }
}
