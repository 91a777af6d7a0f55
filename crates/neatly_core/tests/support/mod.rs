//! Shared fakes for coordinator integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use neatly_core::{
    DispatchObserver, Note, NoteId, Operation, RemoteStore, Session, StoreError, StoreResult, Tag,
    TagId,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

type FailureRule = Box<dyn Fn(&Operation) -> Option<StoreError> + Send + Sync>;
type OperationMatcher = Box<dyn Fn(&Operation) -> bool + Send + Sync>;

struct Gate {
    hold: OperationMatcher,
    release: OperationMatcher,
    notify: Arc<Notify>,
}

/// Store fake that records every mutation and can inject failures.
///
/// Created notes get ids from 100, created tags from 500.
pub struct FakeStore {
    calls: Mutex<Vec<Operation>>,
    failures: Vec<FailureRule>,
    gate: Option<Gate>,
    next_note_id: AtomicI64,
    next_tag_id: AtomicI64,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Vec::new(),
            gate: None,
            next_note_id: AtomicI64::new(100),
            next_tag_id: AtomicI64::new(500),
        }
    }

    /// Fails operations for which `rule` returns an error.
    pub fn failing(
        mut self,
        rule: impl Fn(&Operation) -> Option<StoreError> + Send + Sync + 'static,
    ) -> Self {
        self.failures.push(Box::new(rule));
        self
    }

    /// Holds operations matching `hold` until an operation matching
    /// `release` has been received.
    pub fn holding_until(
        mut self,
        hold: impl Fn(&Operation) -> bool + Send + Sync + 'static,
        release: impl Fn(&Operation) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.gate = Some(Gate {
            hold: Box::new(hold),
            release: Box::new(release),
            notify: Arc::new(Notify::new()),
        });
        self
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn position(&self, predicate: impl Fn(&Operation) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    /// Polls until at least `count` calls were recorded.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<Operation> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} calls, got {:?}", self.calls());
    }

    async fn record(&self, session: &Session, operation: Operation) -> StoreResult<()> {
        if !session.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }
        self.calls.lock().unwrap().push(operation.clone());

        if let Some(gate) = self.gate.as_ref() {
            if (gate.release)(&operation) {
                gate.notify.notify_one();
            }
            if (gate.hold)(&operation) {
                gate.notify.notified().await;
            }
        }

        match self.failures.iter().find_map(|rule| rule(&operation)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn create_note(
        &self,
        session: &Session,
        header: &str,
        body: &str,
    ) -> StoreResult<NoteId> {
        self.record(
            session,
            Operation::CreateNote {
                header: header.to_string(),
                body: body.to_string(),
            },
        )
        .await?;
        Ok(self.next_note_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn update_note(
        &self,
        session: &Session,
        note_id: NoteId,
        header: &str,
        body: &str,
    ) -> StoreResult<()> {
        self.record(
            session,
            Operation::UpdateNote {
                note_id,
                header: header.to_string(),
                body: body.to_string(),
            },
        )
        .await
    }

    async fn delete_note(&self, session: &Session, note_id: NoteId) -> StoreResult<()> {
        self.record(session, Operation::DeleteNote { note_id }).await
    }

    async fn create_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        label: &str,
    ) -> StoreResult<TagId> {
        self.record(
            session,
            Operation::CreateTag {
                note_id,
                label: label.to_string(),
            },
        )
        .await?;
        Ok(self.next_tag_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn attach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
        label: &str,
    ) -> StoreResult<()> {
        let label = label.to_string();
        self.record(session, Operation::AttachTag { note_id, tag_id, label })
            .await
    }

    async fn detach_tag(
        &self,
        session: &Session,
        note_id: NoteId,
        tag_id: TagId,
    ) -> StoreResult<()> {
        self.record(session, Operation::DetachTag { note_id, tag_id })
            .await
    }

    async fn rename_tag(&self, session: &Session, tag_id: TagId, label: &str) -> StoreResult<()> {
        self.record(
            session,
            Operation::RenameTag {
                tag_id,
                label: label.to_string(),
            },
        )
        .await
    }

    async fn list_tags(&self, _session: &Session) -> StoreResult<Vec<Tag>> {
        Ok(Vec::new())
    }

    async fn list_notes(
        &self,
        _session: &Session,
        _tag_filter: &[String],
    ) -> StoreResult<Vec<Note>> {
        Ok(Vec::new())
    }

    async fn get_note(&self, _session: &Session, note_id: NoteId) -> StoreResult<Note> {
        Err(StoreError::not_found(format!("note not found: {note_id}")))
    }
}

/// Observer that keeps every reported failure.
#[derive(Default)]
pub struct RecordingObserver {
    failures: Mutex<Vec<(Operation, StoreError)>>,
    successes: Mutex<Vec<Operation>>,
}

impl RecordingObserver {
    pub fn failures(&self) -> Vec<(Operation, StoreError)> {
        self.failures.lock().unwrap().clone()
    }

    pub fn success_count(&self) -> usize {
        self.successes.lock().unwrap().len()
    }
}

impl DispatchObserver for RecordingObserver {
    fn on_failure(&self, operation: &Operation, error: &StoreError) {
        self.failures
            .lock()
            .unwrap()
            .push((operation.clone(), error.clone()));
    }

    fn on_success(&self, operation: &Operation, _ack: &neatly_core::OperationAck) {
        self.successes.lock().unwrap().push(operation.clone());
    }
}

pub fn session() -> Session {
    Session::from_token("test-token")
}
