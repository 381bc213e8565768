//! Session registry and WebSocket connection handling.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use boxlink_core::sync::{ClientMessage, ServerMessage};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// A broadcast tagged with the peer that caused it.
type Relayed = (String, ServerMessage);

/// Live state of one session.
struct Session {
    /// Broadcast channel for this session
    tx: broadcast::Sender<Relayed>,
    /// Connected peer IDs
    peers: HashSet<String>,
    /// Most recent payload, handed to late joiners
    latest: Option<String>,
}

impl Session {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
            latest: None,
        }
    }
}

/// Result of joining a session.
pub struct Joined {
    pub rx: broadcast::Receiver<Relayed>,
    pub latest: Option<String>,
    pub peer_count: usize,
}

/// Shared relay state: every active session by name.
#[derive(Default)]
pub struct RelayState {
    sessions: DashMap<String, Session>,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer to a session, creating it on first join.
    pub fn join(&self, session: &str, peer_id: &str) -> Joined {
        let mut entry = self.sessions.entry(session.to_string()).or_insert_with(Session::new);
        entry.peers.insert(peer_id.to_string());
        Joined {
            rx: entry.tx.subscribe(),
            latest: entry.latest.clone(),
            peer_count: entry.peers.len(),
        }
    }

    /// Remove a peer; the session and its latest payload go away with the last peer.
    pub fn leave(&self, session: &str, peer_id: &str) {
        if self.remove_peer(session, peer_id) {
            self.close_if_empty(session);
        }
    }

    /// Returns whether the session was left without peers.
    fn remove_peer(&self, session: &str, peer_id: &str) -> bool {
        match self.sessions.get_mut(session) {
            Some(mut entry) => {
                entry.peers.remove(peer_id);
                entry.peers.is_empty()
            }
            None => false,
        }
    }

    /// Drop the session unless a peer joined since it emptied.
    fn close_if_empty(&self, session: &str) {
        if self.sessions.remove_if(session, |_, s| s.peers.is_empty()).is_some() {
            debug!("Session {} closed", session);
        }
    }

    /// Remember `payload` as the session's latest and forward it to the other peers.
    pub fn publish(&self, session: &str, from: &str, payload: String) {
        if let Some(mut entry) = self.sessions.get_mut(session) {
            entry.latest = Some(payload.clone());
            let _ = entry.tx.send((
                from.to_string(),
                ServerMessage::Publish {
                    from: from.to_string(),
                    payload,
                },
            ));
        }
    }

    /// Broadcast to the session; receivers drop messages from themselves.
    pub fn broadcast(&self, session: &str, from: &str, msg: ServerMessage) {
        if let Some(entry) = self.sessions.get(session) {
            let _ = entry.tx.send((from.to_string(), msg));
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn peer_count(&self, session: &str) -> usize {
        self.sessions.get(session).map_or(0, |s| s.peers.len())
    }

    pub fn latest(&self, session: &str) -> Option<String> {
        self.sessions.get(session).and_then(|s| s.latest.clone())
    }
}

/// The relay's HTTP routes.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "BoxLink Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// One connected peer and the session it is in.
struct Connection {
    peer_id: String,
    state: Arc<RelayState>,
    session: Option<String>,
    rx: Option<broadcast::Receiver<Relayed>>,
}

impl Connection {
    /// Apply a client message; returns replies for this peer only.
    fn handle(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Join { session } => {
                self.leave();
                let joined = self.state.join(&session, &self.peer_id);
                self.rx = Some(joined.rx);
                self.state.broadcast(
                    &session,
                    &self.peer_id,
                    ServerMessage::PeerJoined {
                        peer_id: self.peer_id.clone(),
                    },
                );
                info!("Peer {} joined session {}", self.peer_id, session);
                self.session = Some(session.clone());
                Some(ServerMessage::Joined {
                    session,
                    peer_count: joined.peer_count,
                    latest: joined.latest,
                })
            }
            ClientMessage::Leave => {
                self.leave();
                None
            }
            ClientMessage::Publish { payload } => match &self.session {
                Some(session) => {
                    self.state.publish(session, &self.peer_id, payload);
                    None
                }
                None => Some(ServerMessage::Error {
                    message: "Join a session before publishing".to_string(),
                }),
            },
        }
    }

    fn leave(&mut self) {
        self.rx = None;
        if let Some(session) = self.session.take() {
            self.state.leave(&session, &self.peer_id);
            self.state.broadcast(
                &session,
                &self.peer_id,
                ServerMessage::PeerLeft {
                    peer_id: self.peer_id.clone(),
                },
            );
            info!("Peer {} left session {}", self.peer_id, session);
        }
    }

    /// Next broadcast from the session, or never when not in one.
    async fn next_relayed(&mut self) -> Option<Relayed> {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            match rx.recv().await {
                Ok(relayed) => return Some(relayed),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Peer {} lagged, skipped {} messages", self.peer_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        self.rx = None;
        None
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut conn = Connection {
        peer_id: peer_id.clone(),
        state,
        session: None,
        rx: None,
    };

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let reply = match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => conn.handle(client_msg),
                        Err(e) => {
                            warn!("Invalid message from {}: {}", peer_id, e);
                            Some(ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            })
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None, // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };
                if let Some(out) = reply.as_ref().and_then(encode) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }

            relayed = conn.next_relayed() => {
                let Some((from, msg)) = relayed else {
                    continue;
                };
                // Don't echo back to sender
                if from == peer_id {
                    continue;
                }
                if let Some(out) = encode(&msg) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    conn.leave();
    info!("Connection closed: {}", peer_id);
}
