//! Synchronization engine
//!
//! Orchestrates the three flows between the local store and the backend:
//!
//! 1. Initial bulk fetch into the store
//! 2. Optimistic local mutation, followed by a fire-and-forget remote call
//! 3. Real-time event consumption, ignoring echoes of this client's writes
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SyncEngine::new(gateway, OriginTag::process().clone());
//! engine.load().await;
//!
//! let mut subs = engine.subscribe().await?;
//! while let Some(event) = subs.next_event().await {
//!     engine.apply_remote_event(event);
//! }
//! subs.cancel();
//! ```

mod engine;
mod realtime;

pub use engine::{PendingMutation, SyncEngine};
pub use realtime::{action_for_event, EventOutcome, Subscriptions};
