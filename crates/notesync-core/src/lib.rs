//! notesync Core Library
//!
//! This crate keeps a locally cached, optimistically updated view of a
//! shared notes collection that other clients mutate concurrently.
//!
//! # Architecture
//!
//! - **Reducer**: every state change is an [`Action`] applied by the pure
//!   [`reduce`] function, producing a new [`AppState`] snapshot
//! - **Store**: the single dispatch point, publishing snapshots to observers
//! - **Sync engine**: optimistic local mutation, fire-and-forget remote
//!   calls, and real-time event consumption with self-echo suppression
//!
//! # Quick Start
//!
//! ```text
//! let gateway = Arc::new(MemoryGateway::new());
//! let mut engine = SyncEngine::new(gateway, OriginTag::process().clone());
//!
//! engine.load().await;
//! engine.set_input(FormField::Name, "Milk");
//! engine.set_input(FormField::Description, "2%");
//! engine.submit_form()?;
//!
//! let mut subs = engine.subscribe().await?;
//! while let Some(event) = subs.next_event().await {
//!     engine.apply_remote_event(event);
//! }
//! ```
//!
//! # Modules
//!
//! - `identity`: Per-process origin tag
//! - `models`: Notes, drafts, and mutation payloads
//! - `state`: Application snapshot, actions, and the reducer
//! - `store`: Snapshot holder and dispatch
//! - `gateway`: Remote gateway contract and implementations
//! - `sync`: Synchronization engine
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod state;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{GatewayError, SyncError};
pub use gateway::{EventKind, MemoryGateway, RemoteEvent, RemoteGateway, Subscription, WsGateway};
pub use identity::OriginTag;
pub use models::{FormField, Note, NoteDraft, NoteId, NoteUpdate};
pub use state::{reduce, Action, AppState};
pub use store::Store;
pub use sync::{EventOutcome, PendingMutation, Subscriptions, SyncEngine};
