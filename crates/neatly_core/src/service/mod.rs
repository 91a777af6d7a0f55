//! Note mutation use-cases and their dispatch machinery.
//!
//! # Responsibility
//! - Orchestrate reconciliation and store calls into UI-level operations.
//! - Keep UI callers decoupled from store and transport details.

pub mod dispatch;
pub mod note_coordinator;
pub mod observer;
