//! Tag identity classification.
//!
//! # Invariants
//! - Total over all tags: only the ephemeral sentinel maps to `Ephemeral`.
//! - Classification has no side effects.

use crate::model::tag::{Tag, TagId, EPHEMERAL_TAG_ID};

/// Persistence state of one tag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIdentity<'a> {
    /// Already persisted; `TagId` is stable.
    Existing(TagId),
    /// Created during the current edit; must be created remotely first.
    Ephemeral(&'a str),
}

/// Classifies one tag as existing or ephemeral.
pub fn classify(tag: &Tag) -> TagIdentity<'_> {
    if tag.id == EPHEMERAL_TAG_ID {
        TagIdentity::Ephemeral(tag.label.as_str())
    } else {
        TagIdentity::Existing(tag.id)
    }
}
