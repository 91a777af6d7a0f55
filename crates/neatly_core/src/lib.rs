//! Core client logic for neatly notes.
//! Owns tag-association reconciliation and note mutation dispatch against a
//! remote store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod store;

pub use config::{ClientConfig, ConfigError};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::note::{Note, NoteId};
pub use model::operation::Operation;
pub use model::session::{AccountInfo, Session};
pub use model::tag::{Tag, TagId, EPHEMERAL_TAG_ID};
pub use reconcile::reconciler::{reconcile, TagReconciliation};
pub use reconcile::resolver::{classify, TagIdentity};
pub use service::dispatch::{
    DispatchHandle, DispatchReport, FlowKind, FlowState, OperationAck, OperationOutcome,
};
pub use service::note_coordinator::NoteMutationCoordinator;
pub use service::observer::{DispatchObserver, LogObserver};
pub use store::account::AccountClient;
pub use store::http::HttpRemoteStore;
pub use store::sqlite::SqliteRemoteStore;
pub use store::{RemoteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
