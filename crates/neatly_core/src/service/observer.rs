//! Observability sink for dispatched operations.
//!
//! # Responsibility
//! - Receive the outcome of every dispatched operation.
//! - Provide the default log-backed sink.
//!
//! # Invariants
//! - Observers are called from runtime tasks and must not block.
//! - The log sink emits metadata only (`Operation` display, error kind,
//!   status); rejection messages are logged at debug level.

use crate::model::operation::Operation;
use crate::service::dispatch::OperationAck;
use crate::store::StoreError;
use log::{debug, warn};

/// Sink notified about every dispatched operation.
pub trait DispatchObserver: Send + Sync {
    /// Called once per failed operation.
    fn on_failure(&self, operation: &Operation, error: &StoreError);

    /// Called once per successful operation.
    fn on_success(&self, _operation: &Operation, _ack: &OperationAck) {}
}

/// Observer that writes operation outcomes to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl DispatchObserver for LogObserver {
    fn on_failure(&self, operation: &Operation, error: &StoreError) {
        match error.status() {
            Some(status) => warn!(
                "event=op_failed module=dispatch status=error {operation} error_kind={} http_status={status}",
                error.kind()
            ),
            None => warn!(
                "event=op_failed module=dispatch status=error {operation} error_kind={}",
                error.kind()
            ),
        }
        debug!("event=op_failed_detail module=dispatch {operation} error={error}");
    }

    fn on_success(&self, operation: &Operation, ack: &OperationAck) {
        match ack {
            OperationAck::NoteCreated(note_id) => {
                debug!("event=op_ok module=dispatch status=ok {operation} created_note_id={note_id}")
            }
            OperationAck::TagCreated(tag_id) => {
                debug!("event=op_ok module=dispatch status=ok {operation} created_tag_id={tag_id}")
            }
            OperationAck::Done => debug!("event=op_ok module=dispatch status=ok {operation}"),
        }
    }
}
