//! Tag identity resolution and association reconciliation.
//!
//! # Responsibility
//! - Classify tags as persisted or client-only.
//! - Compute the minimal remote tag operations for one note edit.
//!
//! # Invariants
//! - Nothing in this module performs I/O.

pub mod reconciler;
pub mod resolver;
