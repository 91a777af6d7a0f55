//! Tag domain model.
//!
//! # Responsibility
//! - Define the labeled tag value shared by notes, reconciliation and stores.
//! - Own the ephemeral sentinel used for tags created during an edit.
//!
//! # Invariants
//! - A persisted tag is identified by `id` only; `label` does not take part
//!   in identity once the store has assigned an id.
//! - `id == EPHEMERAL_TAG_ID` means "not yet created remotely".
//! - Ephemeral tags are never merged, even when their labels are equal.

use serde::{Deserialize, Serialize};

/// Store-assigned tag identifier.
pub type TagId = i64;

/// Reserved identifier carried by tags that only exist client-side.
pub const EPHEMERAL_TAG_ID: TagId = 0;

/// Labeled tag attached to notes through a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Persisted identifier, or `EPHEMERAL_TAG_ID` for new tags.
    #[serde(default)]
    pub id: TagId,
    /// Display label.
    pub label: String,
    /// Optional display color (hex without `#`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Tag {
    /// Creates a reference to an already persisted tag.
    pub fn existing(id: TagId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            color: None,
        }
    }

    /// Creates a client-only tag that must be created remotely before use.
    pub fn ephemeral(label: impl Into<String>) -> Self {
        Self::existing(EPHEMERAL_TAG_ID, label)
    }

    /// Returns whether this tag has not been persisted yet.
    pub fn is_ephemeral(&self) -> bool {
        self.id == EPHEMERAL_TAG_ID
    }
}

#[cfg(test)]
mod tests {
    use super::{Tag, EPHEMERAL_TAG_ID};

    #[test]
    fn ephemeral_constructor_uses_sentinel() {
        let tag = Tag::ephemeral("urgent");
        assert_eq!(tag.id, EPHEMERAL_TAG_ID);
        assert!(tag.is_ephemeral());
        assert!(!Tag::existing(7, "work").is_ephemeral());
    }

    #[test]
    fn deserializes_backend_shape_with_color() {
        let tag: Tag =
            serde_json::from_str(r#"{"id":3,"label":"work","color":"47B5FF"}"#).unwrap();
        assert_eq!(tag.id, 3);
        assert_eq!(tag.color.as_deref(), Some("47B5FF"));

        let bare: Tag = serde_json::from_str(r#"{"label":"new"}"#).unwrap();
        assert!(bare.is_ephemeral());
    }
}
