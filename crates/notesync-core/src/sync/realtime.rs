//! Real-time event consumption
//!
//! The backend pushes created/deleted/updated events to every subscriber,
//! including the client that caused them. Each event carries the origin tag
//! of the note, so a client drops events stamped with its own tag instead
//! of re-applying a change it already made optimistically.

use tracing::debug;

use crate::error::SyncError;
use crate::gateway::{EventKind, RemoteEvent, RemoteGateway, Subscription};
use crate::identity::OriginTag;
use crate::state::Action;

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Dispatched to the store
    Applied,
    /// Carried our own origin tag and was discarded
    SuppressedEcho,
}

/// Map an inbound event to the action it should dispatch
///
/// Returns `None` for echoes of `own_tag`'s writes.
pub fn action_for_event(event: RemoteEvent, own_tag: &OriginTag) -> Option<Action> {
    if &event.note.origin_tag == own_tag {
        return None;
    }

    let note = event.note;
    Some(match event.kind {
        EventKind::Created => Action::AddNote { note },
        EventKind::Deleted => Action::DeleteNote { note },
        EventKind::Updated => Action::UpdateNote { note },
    })
}

/// The three live event subscriptions of one client
///
/// Acquired together and released together. [`Subscriptions::cancel`]
/// consumes the value, so release happens exactly once; dropping it has
/// the same effect. No event is delivered after release.
#[derive(Debug)]
pub struct Subscriptions {
    created: Subscription,
    deleted: Subscription,
    updated: Subscription,
}

impl Subscriptions {
    /// Subscribe to every event kind
    ///
    /// If any subscription fails, the ones already acquired are released.
    pub async fn acquire(gateway: &dyn RemoteGateway) -> Result<Self, SyncError> {
        let subscribe = |kind: EventKind| async move {
            gateway
                .subscribe(kind)
                .await
                .map_err(|source| SyncError::SubscribeFailed { kind, source })
        };

        let created = subscribe(EventKind::Created).await?;
        let deleted = subscribe(EventKind::Deleted).await?;
        let updated = subscribe(EventKind::Updated).await?;
        debug!("Subscribed to note events");

        Ok(Self {
            created,
            deleted,
            updated,
        })
    }

    /// Wait for the next event of any kind
    ///
    /// Returns `None` once all three streams have ended.
    pub async fn next_event(&mut self) -> Option<RemoteEvent> {
        tokio::select! {
            Some(note) = self.created.recv() => Some(RemoteEvent::new(EventKind::Created, note)),
            Some(note) = self.deleted.recv() => Some(RemoteEvent::new(EventKind::Deleted, note)),
            Some(note) = self.updated.recv() => Some(RemoteEvent::new(EventKind::Updated, note)),
            else => None,
        }
    }

    /// Release all three subscriptions
    pub fn cancel(mut self) {
        self.created.close();
        self.deleted.close();
        self.updated.close();
        debug!("Released note event subscriptions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::models::Note;

    fn event(kind: EventKind, tag: &str) -> RemoteEvent {
        RemoteEvent::new(kind, Note::with_id("b", "x", "y", OriginTag::from(tag)))
    }

    #[test]
    fn test_own_events_map_to_nothing() {
        let me = OriginTag::from("me");
        for kind in EventKind::ALL {
            assert_eq!(action_for_event(event(kind, "me"), &me), None);
        }
    }

    #[test]
    fn test_foreign_events_map_to_matching_action() {
        let me = OriginTag::from("me");
        assert!(matches!(
            action_for_event(event(EventKind::Created, "other-client"), &me),
            Some(Action::AddNote { .. })
        ));
        assert!(matches!(
            action_for_event(event(EventKind::Deleted, "other-client"), &me),
            Some(Action::DeleteNote { .. })
        ));
        assert!(matches!(
            action_for_event(event(EventKind::Updated, "other-client"), &me),
            Some(Action::UpdateNote { .. })
        ));
    }

    #[tokio::test]
    async fn test_next_event_merges_streams() {
        let gateway = MemoryGateway::new();
        let mut subs = Subscriptions::acquire(&gateway).await.unwrap();

        gateway.push_event(EventKind::Updated, event(EventKind::Updated, "x").note);
        let received = subs.next_event().await.unwrap();
        assert_eq!(received.kind, EventKind::Updated);

        gateway.push_event(EventKind::Deleted, event(EventKind::Deleted, "x").note);
        assert_eq!(subs.next_event().await.unwrap().kind, EventKind::Deleted);
    }

    #[tokio::test]
    async fn test_cancel_releases_all_three() {
        let gateway = MemoryGateway::new();
        let subs = Subscriptions::acquire(&gateway).await.unwrap();
        for kind in EventKind::ALL {
            assert_eq!(gateway.subscriber_count(kind), 1);
        }

        subs.cancel();
        for kind in EventKind::ALL {
            assert_eq!(gateway.subscriber_count(kind), 0);
        }
    }

    #[tokio::test]
    async fn test_acquire_fails_cleanly() {
        let gateway = MemoryGateway::new();
        gateway.set_failing(true);

        let err = Subscriptions::acquire(&gateway).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::SubscribeFailed {
                kind: EventKind::Created,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_later_failure_releases_earlier_subscriptions() {
        for refused in [EventKind::Deleted, EventKind::Updated] {
            let gateway = MemoryGateway::new();
            gateway.refuse_subscriptions(Some(refused));

            let err = Subscriptions::acquire(&gateway).await.unwrap_err();
            assert!(matches!(err, SyncError::SubscribeFailed { kind, .. } if kind == refused));
            for kind in EventKind::ALL {
                assert_eq!(gateway.subscriber_count(kind), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_next_event_ends_when_streams_close() {
        let (tx_c, created) = Subscription::channel(EventKind::Created);
        let (tx_d, deleted) = Subscription::channel(EventKind::Deleted);
        let (tx_u, updated) = Subscription::channel(EventKind::Updated);
        let mut subs = Subscriptions {
            created,
            deleted,
            updated,
        };

        drop((tx_c, tx_d, tx_u));
        assert_eq!(subs.next_event().await, None);
    }
}
