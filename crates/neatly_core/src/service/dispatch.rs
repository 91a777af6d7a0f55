//! Operation dispatch as runtime task groups.
//!
//! # Responsibility
//! - Execute operations against a `RemoteStore` as independent tokio tasks.
//! - Report every outcome to a `DispatchObserver`.
//! - Hand callers a `DispatchHandle` that can be dropped (fire-and-forget)
//!   or settled to collect a `DispatchReport`.
//!
//! # Invariants
//! - No operation waits for another, except create-before-attach inside one
//!   create-and-attach pair.
//! - A failed create leaves its attach undispatched.
//! - A not-found rejection of `DetachTag` counts as success.
//! - Nothing is retried, compensated or rolled back.
//! - Dropping a handle never cancels dispatched work.

use crate::model::note::NoteId;
use crate::model::operation::Operation;
use crate::model::session::Session;
use crate::model::tag::TagId;
use crate::service::observer::DispatchObserver;
use crate::store::{RemoteStore, StoreError};
use log::{debug, error, warn};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Successful result of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAck {
    NoteCreated(NoteId),
    TagCreated(TagId),
    Done,
}

/// Result of one dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub operation: Operation,
    pub result: Result<OperationAck, StoreError>,
}

impl OperationOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Mutation flow a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    CreateNote,
    UpdateNote,
    DeleteNote,
    RenameTag,
}

impl FlowKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::CreateNote => "create_note",
            Self::UpdateNote => "update_note",
            Self::DeleteNote => "delete_note",
            Self::RenameTag => "rename_tag",
        }
    }
}

/// Lifecycle state of one mutation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Drafting,
    Editing,
    Deleting,
    Renaming,
    /// Every operation of the flow has been issued.
    Dispatched,
}

impl Display for FlowState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Drafting => "drafting",
            Self::Editing => "editing",
            Self::Deleting => "deleting",
            Self::Renaming => "renaming",
            Self::Dispatched => "dispatched",
        };
        f.write_str(name)
    }
}

/// Outcomes collected from a settled flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub flow: FlowKind,
    /// One entry per operation that was actually issued.
    pub outcomes: Vec<OperationOutcome>,
}

impl DispatchReport {
    /// Outcomes whose operation failed.
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }

    /// Returns whether every issued operation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Id assigned by a successful `CreateNote`, if the flow issued one.
    pub fn created_note_id(&self) -> Option<NoteId> {
        self.outcomes.iter().find_map(|outcome| match outcome.result {
            Ok(OperationAck::NoteCreated(note_id)) => Some(note_id),
            _ => None,
        })
    }

    /// Ids assigned by successful `CreateTag` operations, in issue order.
    pub fn created_tag_ids(&self) -> Vec<TagId> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome.result {
                Ok(OperationAck::TagCreated(tag_id)) => Some(tag_id),
                _ => None,
            })
            .collect()
    }

    /// Issued operations, in completion order per task.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.outcomes.iter().map(|outcome| &outcome.operation)
    }
}

/// Executes single operations for one session and reports their outcomes.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn RemoteStore>,
    session: Arc<Session>,
    observer: Arc<dyn DispatchObserver>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        session: Session,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            store,
            session: Arc::new(session),
            observer,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Executes one operation and reports its outcome.
    pub async fn run(&self, operation: Operation) -> OperationOutcome {
        let result = self.execute(&operation).await;
        match &result {
            Ok(ack) => self.observer.on_success(&operation, ack),
            Err(err) => self.observer.on_failure(&operation, err),
        }
        OperationOutcome { operation, result }
    }

    /// Creates a tag on `note_id`, then attaches the created id.
    ///
    /// The attach is skipped when the create fails.
    pub async fn run_create_and_attach(
        &self,
        note_id: NoteId,
        label: String,
    ) -> Vec<OperationOutcome> {
        let created = self
            .run(Operation::CreateTag {
                note_id,
                label: label.clone(),
            })
            .await;
        let tag_id = match created.result {
            Ok(OperationAck::TagCreated(tag_id)) => tag_id,
            _ => {
                warn!(
                    "event=attach_skipped module=dispatch status=error note_id={note_id} reason=create_failed"
                );
                return vec![created];
            }
        };
        let attached = self
            .run(Operation::AttachTag {
                note_id,
                tag_id,
                label,
            })
            .await;
        vec![created, attached]
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationAck, StoreError> {
        let store = self.store.as_ref();
        let session = self.session.as_ref();
        match operation {
            Operation::CreateNote { header, body } => store
                .create_note(session, header, body)
                .await
                .map(OperationAck::NoteCreated),
            Operation::UpdateNote {
                note_id,
                header,
                body,
            } => store
                .update_note(session, *note_id, header, body)
                .await
                .map(|()| OperationAck::Done),
            Operation::DeleteNote { note_id } => store
                .delete_note(session, *note_id)
                .await
                .map(|()| OperationAck::Done),
            Operation::CreateTag { note_id, label } => store
                .create_tag(session, *note_id, label)
                .await
                .map(OperationAck::TagCreated),
            Operation::AttachTag {
                note_id,
                tag_id,
                label,
            } => store
                .attach_tag(session, *note_id, *tag_id, label)
                .await
                .map(|()| OperationAck::Done),
            Operation::DetachTag { note_id, tag_id } => {
                match store.detach_tag(session, *note_id, *tag_id).await {
                    Err(err) if err.is_not_found() => {
                        debug!(
                            "event=detach_absent module=dispatch status=ok note_id={note_id} tag_id={tag_id}"
                        );
                        Ok(OperationAck::Done)
                    }
                    other => other.map(|()| OperationAck::Done),
                }
            }
            Operation::RenameTag { tag_id, label } => store
                .rename_tag(session, *tag_id, label)
                .await
                .map(|()| OperationAck::Done),
        }
    }
}

type OutcomeTask = JoinHandle<Vec<OperationOutcome>>;

/// Tasks spawned for one flow.
///
/// Must be used from within a tokio runtime.
pub struct DispatchGroup {
    dispatcher: Dispatcher,
    tasks: Vec<OutcomeTask>,
}

impl DispatchGroup {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tasks: Vec::new(),
        }
    }

    /// Spawns one operation.
    pub fn spawn(&mut self, operation: Operation) {
        let dispatcher = self.dispatcher.clone();
        self.tasks
            .push(tokio::spawn(async move { vec![dispatcher.run(operation).await] }));
    }

    /// Spawns a create-then-attach pair for one ephemeral tag.
    pub fn spawn_create_and_attach(&mut self, note_id: NoteId, label: String) {
        let dispatcher = self.dispatcher.clone();
        self.tasks.push(tokio::spawn(async move {
            dispatcher.run_create_and_attach(note_id, label).await
        }));
    }

    /// Spawns an arbitrary task producing outcomes.
    pub(crate) fn spawn_task<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = Vec<OperationOutcome>> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Converts the group into a caller-facing handle.
    pub fn into_handle(self, flow: FlowKind) -> DispatchHandle {
        DispatchHandle {
            flow,
            tasks: self.tasks,
        }
    }

    /// Awaits every task of the group.
    pub async fn join(self) -> Vec<OperationOutcome> {
        join_tasks(self.tasks).await
    }
}

/// Handle for one dispatched flow.
///
/// Dropping it leaves every task running.
#[must_use = "drop the handle explicitly for fire-and-forget, or call `settle`"]
pub struct DispatchHandle {
    flow: FlowKind,
    tasks: Vec<OutcomeTask>,
}

impl DispatchHandle {
    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    /// Waits for every operation of the flow and returns their outcomes.
    pub async fn settle(self) -> DispatchReport {
        DispatchReport {
            flow: self.flow,
            outcomes: join_tasks(self.tasks).await,
        }
    }
}

async fn join_tasks(tasks: Vec<OutcomeTask>) -> Vec<OperationOutcome> {
    let mut outcomes = Vec::new();
    for task in tasks {
        match task.await {
            Ok(task_outcomes) => outcomes.extend(task_outcomes),
            Err(err) => error!("event=dispatch_task_lost module=dispatch status=error error={err}"),
        }
    }
    outcomes
}
