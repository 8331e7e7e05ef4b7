//! Sync engine implementation
//!
//! Every user intent is applied to the local store first and only then sent
//! to the backend. The two write paths are not linked: a failed remote call
//! is logged and the optimistic local change stays in place.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::realtime::{action_for_event, EventOutcome, Subscriptions};
use crate::error::{GatewayError, GatewayResult, MutationKind, SyncError};
use crate::gateway::{RemoteEvent, RemoteGateway};
use crate::identity::OriginTag;
use crate::models::{FormField, Note, NoteId, NoteUpdate};
use crate::state::{Action, AppState};
use crate::store::Store;

/// A remote mutation running in the background
///
/// Dropping the handle does not cancel the request.
#[derive(Debug)]
pub struct PendingMutation {
    kind: MutationKind,
    id: NoteId,
    handle: JoinHandle<Result<(), SyncError>>,
}

impl PendingMutation {
    /// Which mutation this is
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Id of the note being mutated
    pub fn id(&self) -> &NoteId {
        &self.id
    }

    /// Wait for the remote call to finish
    pub async fn wait(self) -> Result<(), SyncError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::MutationFailed {
                kind: self.kind,
                id: self.id.to_string(),
                source: GatewayError::Unavailable(e.to_string()),
            }),
        }
    }
}

/// Reconciles local intents and remote events into one store
pub struct SyncEngine {
    /// Local snapshot store
    store: Store,
    /// This client's origin tag
    tag: OriginTag,
    /// Backend
    gateway: Arc<dyn RemoteGateway>,
}

impl SyncEngine {
    /// Create an engine with an empty, still loading store
    pub fn new(gateway: Arc<dyn RemoteGateway>, tag: OriginTag) -> Self {
        Self {
            store: Store::new(),
            tag,
            gateway,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    /// Shared handle to the current snapshot
    pub fn snapshot(&self) -> Arc<AppState> {
        self.store.snapshot()
    }

    /// Watch snapshot changes
    pub fn watch_state(&self) -> watch::Receiver<Arc<AppState>> {
        self.store.subscribe()
    }

    /// This client's origin tag
    pub fn origin_tag(&self) -> &OriginTag {
        &self.tag
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch the whole collection into the store
    ///
    /// On failure the store's `error` flag is set. The error is returned
    /// for callers that want it; nothing is retried.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        match self.gateway.list_notes().await {
            Ok(notes) => {
                info!(count = notes.len(), "Loaded notes");
                self.store.dispatch(Action::set_notes(notes));
                Ok(())
            }
            Err(e) => {
                error!("Failed to fetch notes: {}", e);
                self.store.dispatch(Action::Error);
                Err(SyncError::FetchFailed(e))
            }
        }
    }

    /// Set one field of the creation form
    pub fn set_input(&mut self, field: FormField, value: impl Into<String>) {
        self.store.dispatch(Action::SetInput {
            field,
            value: value.into(),
        });
    }

    /// Create a note from the form
    ///
    /// The note is inserted and the form cleared before the backend hears
    /// about it. Fails with `ValidationFailed`, changing nothing, if either
    /// field is empty.
    pub fn submit_form(&mut self) -> Result<PendingMutation, SyncError> {
        let draft = &self.store.state().form;
        if !draft.is_complete() {
            debug!("Rejected incomplete form");
            return Err(SyncError::ValidationFailed);
        }

        let note = draft.clone().into_note(self.tag.clone());
        let id = note.id.clone();
        debug!(%id, "Creating note");

        self.store.dispatch(Action::AddNote { note: note.clone() });
        self.store.dispatch(Action::ResetForm);

        let gateway = Arc::clone(&self.gateway);
        Ok(self.fire(MutationKind::Create, id, async move {
            gateway.create_note(&note).await
        }))
    }

    /// Delete a note
    ///
    /// Returns `None`, changing nothing, if no note has this id.
    pub fn delete_note(&mut self, id: &NoteId) -> Option<PendingMutation> {
        if !self.store.state().contains(id) {
            warn!(%id, "Delete requested for unknown note");
            return None;
        }

        let notes = self.store.state().notes_without(id);
        self.store.dispatch(Action::SetNotes { notes });

        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        Some(self.fire(MutationKind::Delete, id.clone(), async move {
            gateway.delete_note(&target).await
        }))
    }

    /// Flip a note's completion flag
    ///
    /// Returns `None`, changing nothing, if no note has this id.
    pub fn toggle_completed(&mut self, id: &NoteId) -> Option<PendingMutation> {
        let Some(current) = self.store.state().note(id) else {
            warn!(%id, "Toggle requested for unknown note");
            return None;
        };
        let update = NoteUpdate {
            id: id.clone(),
            completed: !current.completed,
        };

        let notes = self.store.state().notes_mapped(id, Note::toggled);
        self.store.dispatch(Action::SetNotes { notes });

        let gateway = Arc::clone(&self.gateway);
        Some(self.fire(MutationKind::Update, id.clone(), async move {
            gateway.update_note(&update).await
        }))
    }

    /// Subscribe to created/deleted/updated events
    pub async fn subscribe(&self) -> Result<Subscriptions, SyncError> {
        Subscriptions::acquire(self.gateway.as_ref()).await
    }

    /// Apply an inbound event unless it echoes one of our own writes
    pub fn apply_remote_event(&mut self, event: RemoteEvent) -> EventOutcome {
        let kind = event.kind;
        let id = event.note.id.clone();

        match action_for_event(event, &self.tag) {
            Some(action) => {
                debug!(%kind, %id, "Applying remote event");
                self.store.dispatch(action);
                EventOutcome::Applied
            }
            None => {
                debug!(%kind, %id, "Ignoring echo of own write");
                EventOutcome::SuppressedEcho
            }
        }
    }

    /// Run a remote mutation in the background, logging failure
    fn fire<F>(&self, kind: MutationKind, id: NoteId, request: F) -> PendingMutation
    where
        F: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            match request.await {
                Ok(()) => {
                    debug!(%kind, id = %task_id, "Remote mutation acknowledged");
                    Ok(())
                }
                Err(source) => {
                    let err = SyncError::MutationFailed {
                        kind,
                        id: task_id.to_string(),
                        source,
                    };
                    error!("{}", err);
                    Err(err)
                }
            }
        });

        PendingMutation { kind, id, handle }
    }
}
