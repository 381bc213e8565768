//! In-process replication for several editors sharing one process.

use super::{ReplicationChannel, ReplicationError, Result};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex};

struct Member {
    id: u64,
    tx: Sender<String>,
}

#[derive(Default)]
struct HubInner {
    sessions: HashMap<String, Vec<Member>>,
    next_member: u64,
}

/// Routes payloads between [`MemoryChannel`]s joined to the same session.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `session` and return a channel bound to it.
    pub fn join(&self, session: &str) -> MemoryChannel {
        let (tx, rx) = channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_member;
        inner.next_member += 1;
        inner
            .sessions
            .entry(session.to_string())
            .or_default()
            .push(Member { id, tx });
        log::debug!("Member {id} joined in-memory session {session}");
        MemoryChannel {
            hub: self.clone(),
            session: session.to_string(),
            id,
            rx,
        }
    }

    /// Number of live members in `session`.
    pub fn member_count(&self, session: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.sessions.get(session).map_or(0, Vec::len)
    }

    fn broadcast(&self, session: &str, from: u64, payload: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let members = inner
            .sessions
            .get_mut(session)
            .ok_or(ReplicationError::Closed)?;
        // Receivers that went away without leaving are pruned here
        members.retain(|m| m.id == from || m.tx.send(payload.to_string()).is_ok());
        Ok(())
    }

    fn leave(&self, session: &str, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(members) = inner.sessions.get_mut(session) {
            members.retain(|m| m.id != id);
            if members.is_empty() {
                inner.sessions.remove(session);
            }
        }
    }
}

/// One member's end of a [`MemoryHub`] session.
pub struct MemoryChannel {
    hub: MemoryHub,
    session: String,
    id: u64,
    rx: Receiver<String>,
}

impl ReplicationChannel for MemoryChannel {
    fn session(&self) -> &str {
        &self.session
    }

    fn publish(&mut self, payload: String) -> Result<()> {
        self.hub.broadcast(&self.session, self.id, &payload)
    }

    fn poll(&mut self) -> Result<Vec<String>> {
        let mut received = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(payload) => received.push(payload),
                Err(TryRecvError::Empty) => return Ok(received),
                Err(TryRecvError::Disconnected) => {
                    if received.is_empty() {
                        return Err(ReplicationError::Closed);
                    }
                    return Ok(received);
                }
            }
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.hub.leave(&self.session, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_other_members_only() {
        let hub = MemoryHub::new();
        let mut a = hub.join("board");
        let mut b = hub.join("board");
        let mut other = hub.join("elsewhere");

        a.publish("one".to_string()).unwrap();
        a.publish("two".to_string()).unwrap();

        assert_eq!(b.poll().unwrap(), vec!["one", "two"]);
        assert!(a.poll().unwrap().is_empty());
        assert!(other.poll().unwrap().is_empty());
    }

    #[test]
    fn test_drop_leaves_session() {
        let hub = MemoryHub::new();
        let a = hub.join("board");
        {
            let _b = hub.join("board");
            assert_eq!(hub.member_count("board"), 2);
        }
        assert_eq!(hub.member_count("board"), 1);
        drop(a);
        assert_eq!(hub.member_count("board"), 0);
    }
}
