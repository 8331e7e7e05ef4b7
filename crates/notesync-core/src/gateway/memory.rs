//! In-process backend
//!
//! `MemoryGateway` plays the shared backend for several clients living in
//! one process. It keeps the collection, broadcasts every accepted mutation
//! to all live subscribers of the matching kind (the writer included, as a
//! real backend would), and records the calls it receives so tests can
//! check what went over the wire.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{EventKind, RemoteGateway, Subscription, SubscriptionSender};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{Note, NoteId, NoteUpdate};

/// A call received by the memory gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    List,
    Create(Note),
    Delete(NoteId),
    Update(NoteUpdate),
    Subscribe(EventKind),
}

#[derive(Debug, Default)]
struct Inner {
    notes: Vec<Note>,
    subscribers: HashMap<EventKind, Vec<SubscriptionSender>>,
    calls: Vec<GatewayCall>,
    failing: bool,
    /// Subscriptions to this kind are refused
    refused_kind: Option<EventKind>,
}

impl Inner {
    fn check_available(&self) -> GatewayResult<()> {
        if self.failing {
            return Err(GatewayError::Unavailable("memory gateway is failing".to_string()));
        }
        Ok(())
    }

    fn broadcast(&mut self, kind: EventKind, note: &Note) {
        if let Some(senders) = self.subscribers.get_mut(&kind) {
            senders.retain(|tx| tx.send(note.clone()));
            debug!(%kind, id = %note.id, subscribers = senders.len(), "Broadcast event");
        }
    }
}

/// Shared in-memory backend
#[derive(Debug, Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl MemoryGateway {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend already holding `notes`
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let gateway = Self::new();
        gateway.lock().notes = notes;
        gateway
    }

    /// Make every following call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Refuse subscriptions to one event kind (or none)
    pub fn refuse_subscriptions(&self, kind: Option<EventKind>) {
        self.lock().refused_kind = kind;
    }

    /// Current contents of the collection
    pub fn notes(&self) -> Vec<Note> {
        self.lock().notes.clone()
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    /// Number of calls that were mutations
    pub fn mutation_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    GatewayCall::Create(_) | GatewayCall::Delete(_) | GatewayCall::Update(_)
                )
            })
            .count()
    }

    /// Live subscribers for an event kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let mut inner = self.lock();
        match inner.subscribers.get_mut(&kind) {
            Some(senders) => {
                senders.retain(|tx| !tx.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    /// Push an event to subscribers without touching the collection
    ///
    /// Simulates a broadcast caused by some other client.
    pub fn push_event(&self, kind: EventKind, note: Note) {
        self.lock().broadcast(kind, &note);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn list_notes(&self) -> GatewayResult<Vec<Note>> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::List);
        inner.check_available()?;
        Ok(inner.notes.clone())
    }

    async fn create_note(&self, note: &Note) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Create(note.clone()));
        inner.check_available()?;

        if inner.notes.iter().any(|n| n.id == note.id) {
            return Err(GatewayError::Rejected(format!("note {} already exists", note.id)));
        }
        inner.notes.insert(0, note.clone());
        inner.broadcast(EventKind::Created, note);
        Ok(())
    }

    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Delete(id.clone()));
        inner.check_available()?;

        let Some(pos) = inner.notes.iter().position(|n| &n.id == id) else {
            return Err(GatewayError::Rejected(format!("note {} not found", id)));
        };
        let removed = inner.notes.remove(pos);
        inner.broadcast(EventKind::Deleted, &removed);
        Ok(())
    }

    async fn update_note(&self, update: &NoteUpdate) -> GatewayResult<()> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Update(update.clone()));
        inner.check_available()?;

        let Some(note) = inner.notes.iter_mut().find(|n| n.id == update.id) else {
            return Err(GatewayError::Rejected(format!("note {} not found", update.id)));
        };
        note.completed = update.completed;
        let updated = note.clone();
        inner.broadcast(EventKind::Updated, &updated);
        Ok(())
    }

    async fn subscribe(&self, kind: EventKind) -> GatewayResult<Subscription> {
        let mut inner = self.lock();
        inner.calls.push(GatewayCall::Subscribe(kind));
        inner.check_available()?;
        if inner.refused_kind == Some(kind) {
            return Err(GatewayError::Rejected(format!("{} subscriptions refused", kind)));
        }

        let (tx, subscription) = Subscription::channel(kind);
        inner.subscribers.entry(kind).or_default().push(tx);
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OriginTag;

    fn note(id: &str) -> Note {
        Note::with_id(id, "x", "y", OriginTag::from("writer"))
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let gateway = MemoryGateway::new();
        gateway.create_note(&note("a")).await.unwrap();
        gateway.create_note(&note("b")).await.unwrap();

        let ids: Vec<_> = gateway
            .list_notes()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        // Newest first
        assert_eq!(ids, vec![NoteId::from("b"), NoteId::from("a")]);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let gateway = MemoryGateway::new();
        gateway.create_note(&note("a")).await.unwrap();
        let err = gateway.create_note(&note("a")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let gateway = MemoryGateway::new();
        let mut created = gateway.subscribe(EventKind::Created).await.unwrap();
        let mut updated = gateway.subscribe(EventKind::Updated).await.unwrap();
        let mut deleted = gateway.subscribe(EventKind::Deleted).await.unwrap();

        gateway.create_note(&note("a")).await.unwrap();
        gateway
            .update_note(&NoteUpdate {
                id: NoteId::from("a"),
                completed: true,
            })
            .await
            .unwrap();
        gateway.delete_note(&NoteId::from("a")).await.unwrap();

        assert_eq!(created.recv().await.unwrap().id, NoteId::from("a"));
        let update = updated.recv().await.unwrap();
        assert!(update.completed);
        assert_eq!(update.origin_tag, OriginTag::from("writer"));
        assert_eq!(deleted.recv().await.unwrap().name, "x");
        assert!(gateway.notes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_note_is_rejected() {
        let gateway = MemoryGateway::new();
        assert!(gateway.delete_note(&NoteId::from("nope")).await.is_err());
        assert!(gateway
            .update_note(&NoteUpdate {
                id: NoteId::from("nope"),
                completed: true
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failing_gateway_records_calls() {
        let gateway = MemoryGateway::with_notes(vec![note("a")]);
        gateway.set_failing(true);

        assert!(gateway.list_notes().await.is_err());
        assert!(gateway.create_note(&note("b")).await.is_err());
        assert_eq!(gateway.notes().len(), 1);
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(gateway.mutation_count(), 1);

        gateway.set_failing(false);
        assert_eq!(gateway.list_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_released_subscribers_are_pruned() {
        let gateway = MemoryGateway::new();
        let sub = gateway.subscribe(EventKind::Created).await.unwrap();
        assert_eq!(gateway.subscriber_count(EventKind::Created), 1);

        drop(sub);
        assert_eq!(gateway.subscriber_count(EventKind::Created), 0);
        // Broadcasting with no subscribers is fine
        gateway.create_note(&note("a")).await.unwrap();
    }
}
