//! Error types
//!
//! [`GatewayError`] describes what went wrong talking to the backend.
//! [`SyncError`] is what the synchronization engine reports; none of its
//! variants are fatal. A failed fetch shows up as the sticky `error` flag,
//! a failed mutation is only logged, and a failed validation blocks the
//! create action before anything changes.

use thiserror::Error;

use crate::gateway::EventKind;

/// Errors from a remote gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Could not reach the backend
    #[error("Failed to connect to '{url}': {reason}")]
    Connection { url: String, reason: String },

    /// No response within the request timeout
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The backend answered with an error
    #[error("Request rejected by server: {0}")]
    Rejected(String),

    /// A message could not be encoded or decoded
    #[error("Invalid message: {0}")]
    Codec(String),

    /// The connection closed while a request was outstanding
    #[error("Connection closed")]
    Closed,

    /// The backend is unavailable, or the task running the request died
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Check if retrying the same request could succeed
    ///
    /// The engine itself never retries; this is for callers and logs.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::Closed
                | GatewayError::Unavailable(_)
        )
    }
}

/// Which remote mutation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Delete,
    Update,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Delete => write!(f, "delete"),
            MutationKind::Update => write!(f, "update"),
        }
    }
}

/// Errors reported by the synchronization engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The initial bulk fetch failed
    #[error("Failed to fetch notes: {0}")]
    FetchFailed(#[source] GatewayError),

    /// A remote create/delete/update failed; local state is kept as is
    #[error("Failed to {kind} note {id}: {source}")]
    MutationFailed {
        kind: MutationKind,
        id: String,
        #[source]
        source: GatewayError,
    },

    /// A required form field was empty at submit time
    #[error("A name and description are required.")]
    ValidationFailed,

    /// Subscribing to real-time events failed
    #[error("Failed to subscribe to {kind} events: {source}")]
    SubscribeFailed {
        kind: EventKind,
        #[source]
        source: GatewayError,
    },
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout { secs: 10 }.is_transient());
        assert!(GatewayError::Closed.is_transient());
        assert!(!GatewayError::Rejected("nope".to_string()).is_transient());
        assert!(!GatewayError::Codec("bad".to_string()).is_transient());
    }

    #[test]
    fn test_validation_message() {
        assert_eq!(
            SyncError::ValidationFailed.to_string(),
            "A name and description are required."
        );
    }

    #[test]
    fn test_mutation_failed_display() {
        let err = SyncError::MutationFailed {
            kind: MutationKind::Delete,
            id: "abc".to_string(),
            source: GatewayError::Closed,
        };
        let msg = err.to_string();
        assert!(msg.contains("delete"));
        assert!(msg.contains("abc"));
        assert!(msg.contains("Connection closed"));
    }
}
