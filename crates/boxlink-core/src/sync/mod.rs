//! Transports that carry scene snapshots between editor tabs.
//!
//! Every transport implements [`ReplicationChannel`]: a publish/subscribe
//! pipe keyed by a session name that never delivers a message back to the
//! channel that published it.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use memory::{MemoryChannel, MemoryHub};
#[cfg(not(target_arch = "wasm32"))]
pub use native::RelayChannel;
#[cfg(target_arch = "wasm32")]
pub use wasm::BroadcastChannelTransport;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Replication transport errors.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),
    #[error("channel closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Publish/subscribe pipe for serialized snapshots.
pub trait ReplicationChannel {
    /// Session name this channel is bound to.
    fn session(&self) -> &str;

    /// Send a payload to every other member of the session.
    fn publish(&mut self, payload: String) -> Result<()>;

    /// Drain payloads received since the last poll, oldest first.
    fn poll(&mut self) -> Result<Vec<String>>;

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Messages sent to the relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a session
    Join { session: String },
    /// Leave current session
    Leave,
    /// Publish a snapshot payload to the session
    Publish { payload: String },
}

/// Messages received from the relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm session join with the most recent payload, if any
    Joined {
        session: String,
        peer_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        latest: Option<String>,
    },
    /// Peer joined the session
    PeerJoined { peer_id: String },
    /// Peer left the session
    PeerLeft { peer_id: String },
    /// Payload published by another peer
    Publish { from: String, payload: String },
    /// Error message
    Error { message: String },
}
