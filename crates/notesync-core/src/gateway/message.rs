//! Wire protocol message types
//!
//! Messages exchanged with the notes server using CBOR encoding. Every
//! client request carries a `requestId`; the server answers with `items`,
//! `ack`, or `error` for the same id, and pushes `event` messages for
//! active subscriptions (identified by the id of the `subscribe` request).

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::error::GatewayError;
use crate::models::{Note, NoteId, NoteUpdate};

/// Request identifier, unique per connection
pub type RequestId = u64;

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Read the whole collection
    Query {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },

    /// Create a note
    Create {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        note: Note,
    },

    /// Delete a note by id
    Delete {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        id: NoteId,
    },

    /// Set a note's completion flag
    Update {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        update: NoteUpdate,
    },

    /// Start receiving events of one kind
    Subscribe {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        kind: EventKind,
    },

    /// Stop a subscription
    Unsubscribe {
        #[serde(rename = "subscriptionId")]
        subscription_id: RequestId,
    },
}

/// Messages received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Answer to a query
    Items {
        #[serde(rename = "requestId")]
        request_id: RequestId,
        items: Vec<Note>,
    },

    /// A mutation or subscription was accepted
    Ack {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },

    /// A request failed, or a connection-level error without a request
    Error {
        #[serde(rename = "requestId", default)]
        request_id: Option<RequestId>,
        message: String,
    },

    /// A broadcast for an active subscription
    Event {
        #[serde(rename = "subscriptionId")]
        subscription_id: RequestId,
        kind: EventKind,
        note: Note,
    },
}

impl ClientMessage {
    /// The request id this message expects an answer for
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            ClientMessage::Query { request_id }
            | ClientMessage::Create { request_id, .. }
            | ClientMessage::Delete { request_id, .. }
            | ClientMessage::Update { request_id, .. }
            | ClientMessage::Subscribe { request_id, .. } => Some(*request_id),
            ClientMessage::Unsubscribe { .. } => None,
        }
    }

    /// Encode message to CBOR bytes
    pub fn encode(&self) -> Result<Vec<u8>, GatewayError> {
        encode(self)
    }

    /// Decode message from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, GatewayError> {
        decode(bytes)
    }
}

impl ServerMessage {
    /// Encode message to CBOR bytes
    pub fn encode(&self) -> Result<Vec<u8>, GatewayError> {
        encode(self)
    }

    /// Decode message from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, GatewayError> {
        decode(bytes)
    }
}

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, GatewayError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(msg, &mut bytes).map_err(|e| GatewayError::Codec(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, GatewayError> {
    ciborium::from_reader(bytes).map_err(|e| GatewayError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OriginTag;

    #[test]
    fn test_create_message_encoding() {
        let note = Note::with_id("a", "x", "y", OriginTag::from("me"));
        let msg = ClientMessage::Create {
            request_id: 7,
            note,
        };
        let bytes = msg.encode().unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(ClientMessage::decode(&bytes).unwrap(), msg);
        assert_eq!(msg.request_id(), Some(7));
    }

    #[test]
    fn test_unsubscribe_has_no_request_id() {
        let msg = ClientMessage::Unsubscribe { subscription_id: 3 };
        assert_eq!(msg.request_id(), None);
    }

    #[test]
    fn test_server_event_decoding() {
        let msg = ServerMessage::Event {
            subscription_id: 2,
            kind: EventKind::Deleted,
            note: Note::with_id("b", "x", "y", OriginTag::from("other-client")),
        };

        let bytes = msg.encode().unwrap();
        match ServerMessage::decode(&bytes).unwrap() {
            ServerMessage::Event { kind, note, .. } => {
                assert_eq!(kind, EventKind::Deleted);
                assert_eq!(note.origin_tag, OriginTag::from("other-client"));
            }
            other => panic!("Expected Event message, got {:?}", other),
        }
    }

    #[test]
    fn test_error_without_request_id() {
        #[derive(Serialize)]
        struct BareError<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
            message: &'a str,
        }

        let mut bytes = Vec::new();
        ciborium::into_writer(
            &BareError {
                kind: "error",
                message: "shutting down",
            },
            &mut bytes,
        )
        .unwrap();

        assert_eq!(
            ServerMessage::decode(&bytes).unwrap(),
            ServerMessage::Error {
                request_id: None,
                message: "shutting down".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let err = ServerMessage::decode(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, GatewayError::Codec(_)));
    }
}
