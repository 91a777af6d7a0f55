//! Tag-association reconciliation.
//!
//! # Responsibility
//! - Compute which remote tag operations move one note from its previous tag
//!   snapshot to the desired one.
//!
//! # Invariants
//! - `reconcile` is a pure function of its inputs.
//! - The three output sets are pairwise disjoint by tag id.
//! - Every ephemeral tag of `current` yields exactly one create entry; equal
//!   labels are never merged.
//! - Persisted ids are treated as a set; output order follows first
//!   appearance in the input.

use crate::model::tag::{Tag, TagId};
use crate::reconcile::resolver::{classify, TagIdentity};
use std::collections::HashSet;

/// Operation sets required to reconcile one note's tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReconciliation {
    /// Persisted tags to detach from the note.
    pub to_detach: Vec<TagId>,
    /// Labels to create remotely and attach to the note.
    pub to_create_and_attach: Vec<String>,
    /// Persisted tags to attach to the note.
    pub to_attach: Vec<TagId>,
}

impl TagReconciliation {
    /// Returns whether no remote tag operation is required.
    pub fn is_empty(&self) -> bool {
        self.to_detach.is_empty()
            && self.to_create_and_attach.is_empty()
            && self.to_attach.is_empty()
    }

    /// Number of tag operations this reconciliation dispatches, counting a
    /// create-and-attach pair once.
    pub fn len(&self) -> usize {
        self.to_detach.len() + self.to_create_and_attach.len() + self.to_attach.len()
    }
}

/// Computes detach, create-and-attach and attach sets for one note.
pub fn reconcile(previous: &[Tag], current: &[Tag]) -> TagReconciliation {
    let previous_ids = existing_ids(previous);
    let current_ids = existing_ids(current);
    let previous_set: HashSet<TagId> = previous_ids.iter().copied().collect();
    let current_set: HashSet<TagId> = current_ids.iter().copied().collect();

    let to_detach = previous_ids
        .into_iter()
        .filter(|id| !current_set.contains(id))
        .collect();
    let to_attach = current_ids
        .into_iter()
        .filter(|id| !previous_set.contains(id))
        .collect();
    let to_create_and_attach = current
        .iter()
        .filter_map(|tag| match classify(tag) {
            TagIdentity::Ephemeral(label) => Some(label.to_string()),
            TagIdentity::Existing(_) => None,
        })
        .collect();

    TagReconciliation {
        to_detach,
        to_create_and_attach,
        to_attach,
    }
}

fn existing_ids(tags: &[Tag]) -> Vec<TagId> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter_map(|tag| match classify(tag) {
            TagIdentity::Existing(id) => Some(id),
            TagIdentity::Ephemeral(_) => None,
        })
        .filter(|id| seen.insert(*id))
        .collect()
}
