//! Domain model for notes, tags, sessions and remote operations.
//!
//! # Responsibility
//! - Define the value types shared by reconciliation, dispatch and stores.
//!
//! # Invariants
//! - Notes and tags are identified by store-assigned integer ids.
//! - Tags with `EPHEMERAL_TAG_ID` exist only on the client.

pub mod note;
pub mod operation;
pub mod session;
pub mod tag;
