//! Snapshot store
//!
//! The `Store` is the only place actions are applied. It holds the current
//! [`AppState`] snapshot, runs every dispatched action through
//! [`reduce`] in dispatch order, and publishes each new snapshot on a watch
//! channel so observers (a UI, a CLI printer) can re-render.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::new();
//! let mut snapshots = store.subscribe();
//!
//! store.dispatch(Action::ResetForm);
//! let latest = snapshots.borrow().clone();
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use crate::state::{reduce, Action, AppState};

/// Holder of the current application snapshot
pub struct Store {
    /// Current snapshot
    state: Arc<AppState>,
    /// Publishes every new snapshot
    snapshot_tx: watch::Sender<Arc<AppState>>,
    /// Number of actions dispatched so far
    dispatched: u64,
}

impl Store {
    /// Create a store holding the initial state
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    /// Create a store starting from a specific state
    pub fn with_state(state: AppState) -> Self {
        let state = Arc::new(state);
        let (snapshot_tx, _) = watch::channel(Arc::clone(&state));
        Self {
            state,
            snapshot_tx,
            dispatched: 0,
        }
    }

    /// Get the current snapshot
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a shared handle to the current snapshot
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Watch snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.snapshot_tx.subscribe()
    }

    /// Number of actions dispatched since creation
    pub fn dispatch_count(&self) -> u64 {
        self.dispatched
    }

    /// Apply an action and publish the resulting snapshot
    pub fn dispatch(&mut self, action: Action) -> Arc<AppState> {
        trace!(action = action.kind(), "dispatch");
        let next = Arc::new(reduce(&self.state, action));
        self.state = Arc::clone(&next);
        self.dispatched += 1;
        // Stored even when nobody is watching yet
        self.snapshot_tx.send_replace(Arc::clone(&next));
        next
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
