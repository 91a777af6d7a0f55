//! Remote operation value objects.
//!
//! # Responsibility
//! - Name every mutation the client can issue against a remote store.
//! - Render metadata-only descriptions for logging.
//!
//! # Invariants
//! - Operations have no identity beyond their parameters.
//! - `Display` never includes labels, headers or bodies.

use crate::model::note::NoteId;
use crate::model::tag::TagId;
use std::fmt::{Display, Formatter};

/// One mutation issued against a remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateNote {
        header: String,
        body: String,
    },
    UpdateNote {
        note_id: NoteId,
        header: String,
        body: String,
    },
    DeleteNote {
        note_id: NoteId,
    },
    /// Creates a tag and associates it with `note_id`.
    CreateTag {
        note_id: NoteId,
        label: String,
    },
    /// Associates a persisted tag with `note_id`. The label travels with
    /// the id because the REST store resolves tags by label.
    AttachTag {
        note_id: NoteId,
        tag_id: TagId,
        label: String,
    },
    /// Removes the association; an absent association is not an error.
    DetachTag {
        note_id: NoteId,
        tag_id: TagId,
    },
    RenameTag {
        tag_id: TagId,
        label: String,
    },
}

impl Operation {
    /// Stable snake_case name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateNote { .. } => "create_note",
            Self::UpdateNote { .. } => "update_note",
            Self::DeleteNote { .. } => "delete_note",
            Self::CreateTag { .. } => "create_tag",
            Self::AttachTag { .. } => "attach_tag",
            Self::DetachTag { .. } => "detach_tag",
            Self::RenameTag { .. } => "rename_tag",
        }
    }

    /// Note this operation targets, when it has one.
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::CreateNote { .. } | Self::RenameTag { .. } => None,
            Self::UpdateNote { note_id, .. }
            | Self::DeleteNote { note_id }
            | Self::CreateTag { note_id, .. }
            | Self::AttachTag { note_id, .. }
            | Self::DetachTag { note_id, .. } => Some(*note_id),
        }
    }

    /// Tag this operation targets, when it has a persisted one.
    pub fn tag_id(&self) -> Option<TagId> {
        match self {
            Self::AttachTag { tag_id, .. }
            | Self::DetachTag { tag_id, .. }
            | Self::RenameTag { tag_id, .. } => Some(*tag_id),
            _ => None,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "op={}", self.name())?;
        if let Some(note_id) = self.note_id() {
            write!(f, " note_id={note_id}")?;
        }
        if let Some(tag_id) = self.tag_id() {
            write!(f, " tag_id={tag_id}")?;
        }
        Ok(())
    }
}
