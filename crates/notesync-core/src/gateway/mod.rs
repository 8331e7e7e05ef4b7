//! Remote gateway
//!
//! The backend is reached through the [`RemoteGateway`] trait: one bulk
//! read, three mutations, and a subscription per event kind. The engine
//! treats it as opaque; how requests travel is up to the implementation.
//!
//! ## Implementations
//!
//! - [`MemoryGateway`]: in-process shared backend, for tests and demos
//! - [`WsGateway`]: WebSocket client speaking a CBOR request/response protocol

mod memory;
mod message;
mod ws;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::GatewayResult;
use crate::models::{Note, NoteId, NoteUpdate};

pub use memory::{GatewayCall, MemoryGateway};
pub use message::{ClientMessage, ServerMessage};
pub use ws::WsGateway;

/// Kinds of real-time events the backend broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Deleted,
    Updated,
}

impl EventKind {
    /// Every event kind, in subscription order
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Deleted, EventKind::Updated];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => write!(f, "created"),
            EventKind::Deleted => write!(f, "deleted"),
            EventKind::Updated => write!(f, "updated"),
        }
    }
}

/// An event pushed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub kind: EventKind,
    /// The affected note, carrying its origin tag
    pub note: Note,
}

impl RemoteEvent {
    pub fn new(kind: EventKind, note: Note) -> Self {
        Self { kind, note }
    }
}

/// Receiving end of one event subscription
///
/// Dropping it (or calling [`Subscription::close`]) releases the
/// subscription; the gateway stops delivering to it.
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    rx: mpsc::UnboundedReceiver<Note>,
}

/// Sending end of one event subscription, held by the gateway
#[derive(Debug, Clone)]
pub struct SubscriptionSender {
    tx: mpsc::UnboundedSender<Note>,
}

impl Subscription {
    /// Create a connected sender/subscription pair
    pub fn channel(kind: EventKind) -> (SubscriptionSender, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SubscriptionSender { tx }, Subscription { kind, rx })
    }

    /// The event kind this subscription receives
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Wait for the next note, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<Note> {
        self.rx.recv().await
    }

    /// Stop accepting new notes
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl SubscriptionSender {
    /// Deliver a note; returns false if the subscription was released
    pub fn send(&self, note: Note) -> bool {
        self.tx.send(note).is_ok()
    }

    /// Whether the subscription was released
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolve once the subscription is released
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Contract of the backend the engine talks to
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Read the whole collection
    async fn list_notes(&self) -> GatewayResult<Vec<Note>>;

    /// Create a note
    async fn create_note(&self, note: &Note) -> GatewayResult<()>;

    /// Delete the note with this id
    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()>;

    /// Set the completion flag of a note
    async fn update_note(&self, update: &NoteUpdate) -> GatewayResult<()>;

    /// Subscribe to one kind of real-time event
    async fn subscribe(&self, kind: EventKind) -> GatewayResult<Subscription>;
}
