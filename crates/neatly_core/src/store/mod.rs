//! Remote store contracts and implementations.
//!
//! # Responsibility
//! - Define the asynchronous request/response contract for notes and tags.
//! - Classify store failures into network, rejection and authentication
//!   errors.
//!
//! # Invariants
//! - Each method issues exactly one remote operation.
//! - Every call carries the caller's `Session`; stores keep no credential.
//! - `detach_tag` on an absent association is not an error.
//!
//! # See also
//! - `store::http` for the REST implementation.
//! - `store::sqlite` for the local relational implementation.

use crate::model::note::{Note, NoteId};
use crate::model::session::Session;
use crate::model::tag::{Tag, TagId};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod http;
pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

/// HTTP-style status used for "resource does not exist" rejections.
pub const STATUS_NOT_FOUND: u16 = 404;
/// HTTP-style status used for invalid request payloads.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Failure of one remote store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request did not complete (connect, timeout, transport).
    Network(String),
    /// Store answered with an error status.
    Rejected { status: u16, message: String },
    /// Missing or expired credential.
    NotAuthenticated,
    /// Store answered successfully but the payload could not be decoded.
    InvalidResponse(String),
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Rejected {
            status: STATUS_NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Rejected {
            status: STATUS_BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Stable snake_case kind used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Rejected { .. } => "rejected",
            Self::NotAuthenticated => "not_authenticated",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Returns whether the store rejected the request as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                status: STATUS_NOT_FOUND,
                ..
            }
        )
    }

    /// Returns the rejection status, when the store answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::NotAuthenticated => Some(401),
            _ => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network failure: {message}"),
            Self::Rejected { status, message } => {
                write!(f, "store rejected request with status {status}: {message}")
            }
            Self::NotAuthenticated => write!(f, "not authenticated"),
            Self::InvalidResponse(message) => write!(f, "invalid store response: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Asynchronous note/tag store, one remote operation per call.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates a note and returns its persisted id.
    async fn create_note(&self, session: &Session, header: &str, body: &str)
        -> StoreResult<NoteId>;
    /// Replaces a note's header and body.
    async fn update_note(
        &self,
        session: &Session,
        note_id: NoteId,
        header: &str,
        body: &str,
    ) -> StoreResult<()>;
    /// Deletes a note.
    async fn delete_note(&self, session: &Session, note_id: NoteId) -> StoreResult<()>;
    /// Creates a tag associated with `note_id` and returns its persisted id.
    async fn create_tag(&self, session: &Session, note_id: NoteId, label: &str)
        -> StoreResult<TagId>;
    /// Associates an existing tag with a note; idempotent.
    ///
    /// `label` is the tag's current label; stores that resolve tags by label
    /// need it alongside the id.
    async fn attach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
        label: &str,
    ) -> StoreResult<()>;
    /// Removes an association; an absent association is not an error.
    async fn detach_tag(&self, session: &Session, note_id: NoteId, tag_id: TagId)
        -> StoreResult<()>;
    /// Renames a tag everywhere it is used.
    async fn rename_tag(&self, session: &Session, tag_id: TagId, label: &str) -> StoreResult<()>;
    /// Lists every tag visible to the session.
    async fn list_tags(&self, session: &Session) -> StoreResult<Vec<Tag>>;
    /// Lists notes whose tags match every label filter term.
    async fn list_notes(&self, session: &Session, tag_filter: &[String]) -> StoreResult<Vec<Note>>;
    /// Loads one note with its tags.
    async fn get_note(&self, session: &Session, note_id: NoteId) -> StoreResult<Note>;
}
