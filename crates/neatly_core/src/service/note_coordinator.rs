//! Note mutation use-cases.
//!
//! # Responsibility
//! - Turn create/update/delete/rename requests into dispatched store
//!   operations, reconciling tag associations on every note mutation.
//! - Expose read passthroughs for the UI layer.
//!
//! # Invariants
//! - Mutation flows return a `DispatchHandle` as soon as work is handed to
//!   the runtime; callers never wait unless they call `settle`.
//! - Tag operations of one flow carry no ordering barrier between them or
//!   against `UpdateNote`/`DeleteNote`.
//! - Create flow issues tag operations only after `CreateNote` returned an id.
//! - Operation failures reach the observer, never the caller.
//!
//! # See also
//! - `reconcile::reconciler` for the operation sets.
//! - `service::dispatch` for task groups and settle handles.

use crate::model::note::{Note, NoteId};
use crate::model::operation::Operation;
use crate::model::session::Session;
use crate::model::tag::{Tag, TagId};
use crate::reconcile::reconciler::{reconcile, TagReconciliation};
use crate::service::dispatch::{
    DispatchGroup, DispatchHandle, Dispatcher, FlowKind, FlowState, OperationAck,
};
use crate::service::observer::{DispatchObserver, LogObserver};
use crate::store::{RemoteStore, StoreResult};
use log::info;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Coordinates note mutations for one session.
///
/// Flow methods spawn tokio tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct NoteMutationCoordinator {
    dispatcher: Dispatcher,
}

impl NoteMutationCoordinator {
    /// Creates a coordinator that reports failures through `LogObserver`.
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self::with_observer(store, session, Arc::new(LogObserver))
    }

    pub fn with_observer(
        store: Arc<dyn RemoteStore>,
        session: Session,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(store, session, observer),
        }
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    /// Creates a note, then creates or attaches every tag in `tags`.
    pub fn create_note(
        &self,
        header: impl Into<String>,
        body: impl Into<String>,
        tags: Vec<Tag>,
    ) -> DispatchHandle {
        let dispatcher = self.dispatcher.clone();
        let create = Operation::CreateNote {
            header: header.into(),
            body: body.into(),
        };
        log_transition(FlowKind::CreateNote, None, FlowState::Drafting, tags.len());

        let mut group = DispatchGroup::new(self.dispatcher.clone());
        group.spawn_task(async move {
            let created = dispatcher.run(create).await;
            let note_id = match created.result {
                Ok(OperationAck::NoteCreated(note_id)) => note_id,
                _ => return vec![created],
            };

            let plan = reconcile(&[], &tags);
            let mut tag_ops = DispatchGroup::new(dispatcher);
            dispatch_plan(&mut tag_ops, note_id, plan, &tags);
            log_transition(
                FlowKind::CreateNote,
                Some(note_id),
                FlowState::Dispatched,
                tag_ops.len(),
            );

            let mut outcomes = vec![created];
            outcomes.extend(tag_ops.join().await);
            outcomes
        });
        group.into_handle(FlowKind::CreateNote)
    }

    /// Reconciles tags from `previous` to `desired` and replaces header/body.
    pub fn update_note(
        &self,
        note_id: NoteId,
        previous: &[Tag],
        header: impl Into<String>,
        body: impl Into<String>,
        desired: &[Tag],
    ) -> DispatchHandle {
        let plan = reconcile(previous, desired);
        log_transition(FlowKind::UpdateNote, Some(note_id), FlowState::Editing, plan.len());

        let mut group = DispatchGroup::new(self.dispatcher.clone());
        dispatch_plan(&mut group, note_id, plan, desired);
        group.spawn(Operation::UpdateNote {
            note_id,
            header: header.into(),
            body: body.into(),
        });

        log_transition(FlowKind::UpdateNote, Some(note_id), FlowState::Dispatched, group.len());
        group.into_handle(FlowKind::UpdateNote)
    }

    /// Detaches every persisted tag in `tags` and deletes the note.
    ///
    /// Deletion is not gated on the detaches.
    pub fn delete_note(&self, note_id: NoteId, tags: &[Tag]) -> DispatchHandle {
        log_transition(FlowKind::DeleteNote, Some(note_id), FlowState::Deleting, tags.len());

        let mut group = DispatchGroup::new(self.dispatcher.clone());
        let mut seen = HashSet::new();
        for tag in tags.iter().filter(|tag| !tag.is_ephemeral()) {
            if seen.insert(tag.id) {
                group.spawn(Operation::DetachTag {
                    note_id,
                    tag_id: tag.id,
                });
            }
        }
        group.spawn(Operation::DeleteNote { note_id });

        log_transition(FlowKind::DeleteNote, Some(note_id), FlowState::Dispatched, group.len());
        group.into_handle(FlowKind::DeleteNote)
    }

    /// Renames a tag; identity is unchanged so nothing is reconciled.
    pub fn rename_tag(&self, tag_id: TagId, label: impl Into<String>) -> DispatchHandle {
        log_transition(FlowKind::RenameTag, None, FlowState::Renaming, 1);

        let mut group = DispatchGroup::new(self.dispatcher.clone());
        group.spawn(Operation::RenameTag {
            tag_id,
            label: label.into(),
        });

        log_transition(FlowKind::RenameTag, None, FlowState::Dispatched, group.len());
        group.into_handle(FlowKind::RenameTag)
    }

    /// Lists notes whose tags match every filter term.
    pub async fn list_notes(&self, tag_filter: &[String]) -> StoreResult<Vec<Note>> {
        self.dispatcher
            .store()
            .list_notes(self.dispatcher.session(), tag_filter)
            .await
    }

    pub async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        self.dispatcher
            .store()
            .list_tags(self.dispatcher.session())
            .await
    }

    pub async fn get_note(&self, note_id: NoteId) -> StoreResult<Note> {
        self.dispatcher
            .store()
            .get_note(self.dispatcher.session(), note_id)
            .await
    }
}

/// Spawns detach, create-and-attach and attach operations, in that order.
///
/// Attach labels are taken from `desired`, the tag list `plan` was computed
/// against.
fn dispatch_plan(
    group: &mut DispatchGroup,
    note_id: NoteId,
    plan: TagReconciliation,
    desired: &[Tag],
) {
    let mut labels: HashMap<TagId, &str> = HashMap::new();
    for tag in desired {
        labels.entry(tag.id).or_insert(tag.label.as_str());
    }

    for tag_id in plan.to_detach {
        group.spawn(Operation::DetachTag { note_id, tag_id });
    }
    for label in plan.to_create_and_attach {
        group.spawn_create_and_attach(note_id, label);
    }
    for tag_id in plan.to_attach {
        let label = labels.get(&tag_id).copied().unwrap_or_default();
        group.spawn(Operation::AttachTag {
            note_id,
            tag_id,
            label: label.to_string(),
        });
    }
}

fn log_transition(flow: FlowKind, note_id: Option<NoteId>, state: FlowState, count: usize) {
    match note_id {
        Some(note_id) => info!(
            "event=flow_state module=coordinator flow={} state={state} note_id={note_id} count={count}",
            flow.name()
        ),
        None => info!(
            "event=flow_state module=coordinator flow={} state={state} count={count}",
            flow.name()
        ),
    }
}
