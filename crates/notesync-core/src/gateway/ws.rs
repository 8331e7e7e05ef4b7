//! WebSocket gateway
//!
//! Talks to a notes server over a single WebSocket connection. A background
//! task owns the socket: it writes outgoing requests, matches responses to
//! waiting callers by request id, and routes pushed events to the
//! subscription they belong to. Once a subscription has been released, the
//! next event for it makes the task tell the server to stop sending it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::message::{ClientMessage, RequestId, ServerMessage};
use super::{EventKind, RemoteGateway, Subscription, SubscriptionSender};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{Note, NoteId, NoteUpdate};

/// Successful answer to a request
#[derive(Debug)]
enum Reply {
    Items(Vec<Note>),
    Ack,
}

/// What the connection task does with the answer to a request
enum Pending {
    Request(oneshot::Sender<GatewayResult<Reply>>),
    Subscribe {
        events: SubscriptionSender,
        reply: oneshot::Sender<GatewayResult<Reply>>,
    },
}

/// Work handed to the connection task
enum Command {
    /// Send a message, optionally waiting for its answer
    Send {
        message: ClientMessage,
        pending: Option<Pending>,
    },
    /// The caller stopped waiting for this request
    Forget(RequestId),
}

/// Gateway backed by a WebSocket connection
pub struct WsGateway {
    /// Server URL
    url: String,
    /// How long to wait for each response
    timeout: Duration,
    /// Commands for the connection task
    command_tx: mpsc::UnboundedSender<Command>,
    /// Next request id
    next_id: AtomicU64,
    /// Requests the connection task is still waiting on
    in_flight: Arc<AtomicUsize>,
}

impl WsGateway {
    /// Connect to the server at `url`
    pub async fn connect(url: &str, timeout: Duration) -> GatewayResult<Self> {
        debug!("Connecting to {}", url);
        let (ws_stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| GatewayError::Timeout {
                secs: timeout.as_secs(),
            })?
            .map_err(|e| GatewayError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        info!("Connected to {}", url);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        tokio::spawn(connection_task(
            ws_stream,
            command_rx,
            Arc::clone(&in_flight),
        ));

        Ok(Self {
            url: url.to_string(),
            timeout,
            command_tx,
            next_id: AtomicU64::new(1),
            in_flight,
        })
    }

    /// Server URL this gateway is connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the connection task is still running
    pub fn is_connected(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Number of requests still awaiting a server answer
    pub fn pending_requests(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    fn next_request_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, message: ClientMessage) -> GatewayResult<Reply> {
        let request_id = message.request_id();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(message, Pending::Request(reply_tx))?;
        self.await_reply(request_id, reply_rx).await
    }

    fn send(&self, message: ClientMessage, pending: Pending) -> GatewayResult<()> {
        self.command_tx
            .send(Command::Send {
                message,
                pending: Some(pending),
            })
            .map_err(|_| GatewayError::Closed)
    }

    async fn await_reply(
        &self,
        request_id: Option<RequestId>,
        reply_rx: oneshot::Receiver<GatewayResult<Reply>>,
    ) -> GatewayResult<Reply> {
        match tokio::time::timeout(self.timeout, reply_rx).await {
            Err(_) => {
                if let Some(id) = request_id {
                    // Task may already be gone; nothing left to forget then
                    let _ = self.command_tx.send(Command::Forget(id));
                }
                Err(GatewayError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(_)) => Err(GatewayError::Closed),
            Ok(Ok(reply)) => reply,
        }
    }

    async fn expect_ack(&self, message: ClientMessage) -> GatewayResult<()> {
        match self.request(message).await? {
            Reply::Ack => Ok(()),
            Reply::Items(_) => Err(GatewayError::Codec(
                "expected ack, got items".to_string(),
            )),
        }
    }
}

#[async_trait]
impl RemoteGateway for WsGateway {
    async fn list_notes(&self) -> GatewayResult<Vec<Note>> {
        let request_id = self.next_request_id();
        match self.request(ClientMessage::Query { request_id }).await? {
            Reply::Items(items) => Ok(items),
            Reply::Ack => Err(GatewayError::Codec("expected items, got ack".to_string())),
        }
    }

    async fn create_note(&self, note: &Note) -> GatewayResult<()> {
        let request_id = self.next_request_id();
        self.expect_ack(ClientMessage::Create {
            request_id,
            note: note.clone(),
        })
        .await
    }

    async fn delete_note(&self, id: &NoteId) -> GatewayResult<()> {
        let request_id = self.next_request_id();
        self.expect_ack(ClientMessage::Delete {
            request_id,
            id: id.clone(),
        })
        .await
    }

    async fn update_note(&self, update: &NoteUpdate) -> GatewayResult<()> {
        let request_id = self.next_request_id();
        self.expect_ack(ClientMessage::Update {
            request_id,
            update: update.clone(),
        })
        .await
    }

    async fn subscribe(&self, kind: EventKind) -> GatewayResult<Subscription> {
        let request_id = self.next_request_id();
        let (events, subscription) = Subscription::channel(kind);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(
            ClientMessage::Subscribe { request_id, kind },
            Pending::Subscribe {
                events,
                reply: reply_tx,
            },
        )?;
        self.await_reply(Some(request_id), reply_rx).await?;

        debug!(%kind, subscription_id = request_id, "Subscribed");
        Ok(subscription)
    }
}

/// Own the socket until it closes or the gateway is dropped
async fn connection_task(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    in_flight: Arc<AtomicUsize>,
) {
    let (mut write, mut read) = ws_stream.split();
    let mut pending: HashMap<RequestId, Pending> = HashMap::new();
    let mut subscriptions: HashMap<RequestId, SubscriptionSender> = HashMap::new();

    loop {
        in_flight.store(pending.len(), Ordering::Relaxed);

        let outgoing = tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(Command::Send { message, pending: reply }) => {
                    if let (Some(id), Some(reply)) = (message.request_id(), reply) {
                        pending.insert(id, reply);
                    }
                    message
                }
                Some(Command::Forget(id)) => match pending.remove(&id) {
                    // The server may still register it; tell it to stop
                    Some(Pending::Subscribe { .. }) => ClientMessage::Unsubscribe {
                        subscription_id: id,
                    },
                    _ => continue,
                },
                None => {
                    debug!("Gateway dropped, closing connection");
                    let _ = write.close().await;
                    break;
                }
            },

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => match ServerMessage::decode(&data) {
                        Ok(server_msg) => {
                            match handle_server_message(server_msg, &mut pending, &mut subscriptions) {
                                Some(follow_up) => follow_up,
                                None => continue,
                            }
                        }
                        Err(e) => {
                            warn!("Failed to decode server message: {}", e);
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    _ => continue,
                }
            }
        };

        let bytes = match outgoing.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Some(id) = outgoing.request_id() {
                    fail(pending.remove(&id), e);
                }
                continue;
            }
        };

        if let Err(e) = write.send(Message::Binary(bytes)).await {
            warn!("Failed to send request: {}", e);
            break;
        }
    }

    for (_, waiting) in pending.drain() {
        fail(Some(waiting), GatewayError::Closed);
    }
    in_flight.store(0, Ordering::Relaxed);
    // Dropping the senders ends every subscription stream
    subscriptions.clear();
}

/// Route one server message; returns a message to send back, if any
fn handle_server_message(
    msg: ServerMessage,
    pending: &mut HashMap<RequestId, Pending>,
    subscriptions: &mut HashMap<RequestId, SubscriptionSender>,
) -> Option<ClientMessage> {
    match msg {
        ServerMessage::Items { request_id, items } => {
            if let Some(Pending::Request(reply)) = pending.remove(&request_id) {
                let _ = reply.send(Ok(Reply::Items(items)));
            }
            None
        }
        ServerMessage::Ack { request_id } => match pending.remove(&request_id) {
            Some(Pending::Request(reply)) => {
                let _ = reply.send(Ok(Reply::Ack));
                None
            }
            Some(Pending::Subscribe { events, reply }) => {
                if reply.send(Ok(Reply::Ack)).is_err() {
                    // Caller gave up before the ack arrived
                    return Some(ClientMessage::Unsubscribe {
                        subscription_id: request_id,
                    });
                }
                subscriptions.insert(request_id, events);
                None
            }
            None => {
                debug!(request_id, "Ack for unknown request");
                None
            }
        },
        ServerMessage::Error {
            request_id: Some(request_id),
            message,
        } => {
            fail(pending.remove(&request_id), GatewayError::Rejected(message));
            None
        }
        ServerMessage::Error {
            request_id: None,
            message,
        } => {
            warn!("Server error: {}", message);
            None
        }
        ServerMessage::Event {
            subscription_id,
            kind,
            note,
        } => {
            let events = subscriptions.get(&subscription_id)?;
            if events.send(note) {
                return None;
            }
            // Released locally; tell the server to stop
            subscriptions.remove(&subscription_id);
            debug!(%kind, subscription_id, "Releasing subscription");
            Some(ClientMessage::Unsubscribe { subscription_id })
        }
    }
}

fn fail(pending: Option<Pending>, error: GatewayError) {
    match pending {
        Some(Pending::Request(reply)) | Some(Pending::Subscribe { reply, .. }) => {
            let _ = reply.send(Err(error));
        }
        None => {}
    }
}
