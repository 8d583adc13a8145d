//! Sync actions - the work one participant must do to catch up.

use crate::{FilePath, FileReference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two sides being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncParticipant {
    Left,
    Right,
}

impl SyncParticipant {
    /// The other side.
    pub fn invert(self) -> Self {
        match self {
            SyncParticipant::Left => SyncParticipant::Right,
            SyncParticipant::Right => SyncParticipant::Left,
        }
    }
}

impl fmt::Display for SyncParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncParticipant::Left => f.write_str("left"),
            SyncParticipant::Right => f.write_str("right"),
        }
    }
}

/// A single file operation targeted at one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncAction {
    #[serde(rename_all = "camelCase")]
    AddFile {
        target: SyncParticipant,
        new_file: FileReference,
    },
    #[serde(rename_all = "camelCase")]
    RemoveFile {
        target: SyncParticipant,
        removed_file: FileReference,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceFile {
        target: SyncParticipant,
        old_version: FileReference,
        new_version: FileReference,
    },
}

impl SyncAction {
    pub fn add(target: SyncParticipant, new_file: FileReference) -> Self {
        SyncAction::AddFile { target, new_file }
    }

    pub fn remove(target: SyncParticipant, removed_file: FileReference) -> Self {
        SyncAction::RemoveFile {
            target,
            removed_file,
        }
    }

    pub fn replace(
        target: SyncParticipant,
        old_version: FileReference,
        new_version: FileReference,
    ) -> Self {
        SyncAction::ReplaceFile {
            target,
            old_version,
            new_version,
        }
    }

    /// Participant the action must be applied to.
    pub fn target(&self) -> SyncParticipant {
        match self {
            SyncAction::AddFile { target, .. }
            | SyncAction::RemoveFile { target, .. }
            | SyncAction::ReplaceFile { target, .. } => *target,
        }
    }

    /// Path the action touches.
    pub fn path(&self) -> &FilePath {
        match self {
            SyncAction::AddFile { new_file, .. } => &new_file.path,
            SyncAction::RemoveFile { removed_file, .. } => &removed_file.path,
            SyncAction::ReplaceFile { new_version, .. } => &new_version.path,
        }
    }

    /// The same action aimed at the other participant.
    pub fn inverted(&self) -> Self {
        let mut action = self.clone();
        match &mut action {
            SyncAction::AddFile { target, .. }
            | SyncAction::RemoveFile { target, .. }
            | SyncAction::ReplaceFile { target, .. } => *target = target.invert(),
        }
        action
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::AddFile { target, new_file } => write!(f, "add {new_file} to {target}"),
            SyncAction::RemoveFile {
                target,
                removed_file,
            } => write!(f, "remove {removed_file} from {target}"),
            SyncAction::ReplaceFile {
                target,
                old_version,
                new_version,
            } => write!(f, "replace {old_version} with {new_version} on {target}"),
        }
    }
}
