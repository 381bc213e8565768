//! Snapshot replication between tabs of the same session.
//!
//! Last writer wins: each tab publishes its whole scene after a local change
//! and adopts the newest snapshot received from any other tab.

use crate::scene::Scene;
use crate::snapshot::{Envelope, IncomingSnapshot};
use crate::sync::{ConnectionState, ReplicationChannel, Result};
use uuid::Uuid;

/// Publishes local snapshots and collects remote ones over a [`ReplicationChannel`].
pub struct ReplicationClient {
    client_id: Uuid,
    channel: Box<dyn ReplicationChannel>,
    /// Serialized snapshot last sent or adopted, used to skip unchanged publishes.
    last_synced: Option<String>,
}

impl ReplicationClient {
    pub fn new(channel: Box<dyn ReplicationChannel>) -> Self {
        Self::with_client_id(Uuid::new_v4(), channel)
    }

    pub fn with_client_id(client_id: Uuid, channel: Box<dyn ReplicationChannel>) -> Self {
        log::info!(
            "Replication client {client_id} bound to session {}",
            channel.session()
        );
        Self {
            client_id,
            channel,
            last_synced: None,
        }
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn session(&self) -> &str {
        self.channel.session()
    }

    pub fn state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Publish the scene unless it is unchanged since the last sync.
    ///
    /// Returns whether a payload was sent.
    pub fn publish(&mut self, scene: &Scene) -> Result<bool> {
        let snapshot = scene.snapshot();
        let body = serde_json::to_string(&snapshot)?;
        if self.last_synced.as_deref() == Some(body.as_str()) {
            return Ok(false);
        }
        let payload = serde_json::to_string(&Envelope {
            origin: self.client_id,
            snapshot,
        })?;
        self.channel.publish(payload)?;
        self.last_synced = Some(body);
        Ok(true)
    }

    /// Record the scene as already in sync without sending it.
    ///
    /// Called after adopting a remote snapshot so it is not echoed back.
    pub fn mark_synced(&mut self, scene: &Scene) -> Result<()> {
        self.last_synced = Some(serde_json::to_string(&scene.snapshot())?);
        Ok(())
    }

    /// The newest decodable snapshot from another client, if any arrived.
    ///
    /// Older snapshots in the same batch are superseded and discarded.
    pub fn poll(&mut self) -> Result<Option<IncomingSnapshot>> {
        let payloads = self.channel.poll()?;
        for payload in payloads.iter().rev() {
            match IncomingSnapshot::decode(payload) {
                Ok(incoming) if incoming.origin == Some(self.client_id) => continue,
                Ok(incoming) => return Ok(Some(incoming)),
                Err(e) => log::warn!("Discarding undecodable snapshot: {e}"),
            }
        }
        Ok(None)
    }
}
