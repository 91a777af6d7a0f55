//! Note domain model.
//!
//! # Responsibility
//! - Define the note record exchanged with stores and the UI layer.
//! - Derive the short-body projection the store exposes for list views.
//!
//! # Invariants
//! - `id` is `None` only before the first successful create.
//! - `tags` keeps caller order; reconciliation treats it as a set of ids.

use crate::model::tag::Tag;
use serde::{Deserialize, Serialize};

/// Store-assigned note identifier.
pub type NoteId = i64;

/// Maximum number of characters kept in `short_body`.
pub const SHORT_BODY_MAX_CHARS: usize = 255;

/// Default color assigned to notes created by this client.
pub const DEFAULT_NOTE_COLOR: &str = "47B5FF";

/// Note with core fields and its ordered tag sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Persisted identifier; `None` while drafting.
    #[serde(default)]
    pub id: Option<NoteId>,
    /// Title line.
    pub header: String,
    /// Markdown body.
    #[serde(default)]
    pub body: String,
    /// Store-derived body prefix for list views.
    #[serde(default)]
    pub short_body: String,
    /// Ordered tag sequence.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Display color (hex without `#`).
    #[serde(default)]
    pub color: Option<String>,
    /// Last edit timestamp as reported by the store.
    #[serde(default)]
    pub edited: Option<String>,
}

impl Note {
    /// Creates an unsaved note draft.
    pub fn draft(header: impl Into<String>, body: impl Into<String>, tags: Vec<Tag>) -> Self {
        let body = body.into();
        Self {
            id: None,
            header: header.into(),
            short_body: short_body(body.as_str()),
            body,
            tags,
            color: Some(DEFAULT_NOTE_COLOR.to_string()),
            edited: None,
        }
    }
}

/// Returns the first `SHORT_BODY_MAX_CHARS` characters of `body`.
pub fn short_body(body: &str) -> String {
    body.chars().take(SHORT_BODY_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::{short_body, Note, SHORT_BODY_MAX_CHARS};
    use crate::model::tag::Tag;

    #[test]
    fn short_body_truncates_by_chars_not_bytes() {
        let body = "ż".repeat(SHORT_BODY_MAX_CHARS + 10);
        assert_eq!(short_body(&body).chars().count(), SHORT_BODY_MAX_CHARS);
        assert_eq!(short_body("tiny"), "tiny");
    }

    #[test]
    fn draft_has_no_id_and_derives_short_body() {
        let note = Note::draft("h", "body", vec![Tag::ephemeral("new")]);
        assert_eq!(note.id, None);
        assert_eq!(note.short_body, "body");
        assert_eq!(note.tags.len(), 1);
    }

    #[test]
    fn deserializes_backend_note_payload() {
        let json = r#"{
            "id": 4,
            "header": "groceries",
            "body": "milk",
            "shortBody": "milk",
            "tags": [{"id": 2, "label": "home", "color": "CFD2CF"}],
            "color": "CFD2CF",
            "edited": "2022-06-01T10:00:00Z"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, Some(4));
        assert_eq!(note.short_body, "milk");
        assert_eq!(
            note.tags,
            vec![Tag {
                color: Some("CFD2CF".into()),
                ..Tag::existing(2, "home")
            }]
        );
    }
}
