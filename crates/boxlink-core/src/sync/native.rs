//! WebSocket client for the relay server.
//!
//! The socket lives on a background thread; the editor talks to it through
//! channels so publishing and polling never block the UI thread.

use super::{
    ClientMessage, ConnectionState, ReplicationChannel, ReplicationError, Result, ServerMessage,
};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// Events reported by the WebSocket thread.
enum WsEvent {
    Connected,
    Disconnected,
    Server(ServerMessage),
    Failed(String),
}

/// Replication channel backed by a `boxlink-server` relay session.
pub struct RelayChannel {
    session: String,
    state: ConnectionState,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Receiver<WsEvent>,
    _thread: Option<JoinHandle<()>>,
}

impl RelayChannel {
    /// Connect to `url` and join `session`.
    ///
    /// Returns as soon as the background thread is started; the join and any
    /// publishes queued before the socket opens are sent once it does.
    pub fn connect(url: &str, session: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| ReplicationError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(ReplicationError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<WsEvent>();

        let join = serde_json::to_string(&ClientMessage::Join {
            session: session.to_string(),
        })?;
        cmd_tx
            .send(WsCommand::Send(join))
            .map_err(|_| ReplicationError::Closed)?;

        let url = url.to_string();
        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        Ok(Self {
            session: session.to_string(),
            state: ConnectionState::Connecting,
            cmd_tx: Some(cmd_tx),
            event_rx,
            _thread: Some(handle),
        })
    }

    /// Leave the session and close the socket.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            if let Ok(leave) = serde_json::to_string(&ClientMessage::Leave) {
                let _ = tx.send(WsCommand::Send(leave));
            }
            let _ = tx.send(WsCommand::Close);
        }
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl ReplicationChannel for RelayChannel {
    fn session(&self) -> &str {
        &self.session
    }

    fn publish(&mut self, payload: String) -> Result<()> {
        let tx = self.cmd_tx.as_ref().ok_or(ReplicationError::Closed)?;
        let msg = serde_json::to_string(&ClientMessage::Publish { payload })?;
        tx.send(WsCommand::Send(msg))
            .map_err(|_| ReplicationError::Closed)
    }

    fn poll(&mut self) -> Result<Vec<String>> {
        let mut payloads = Vec::new();
        let mut failure = None;
        loop {
            match self.event_rx.try_recv() {
                Ok(WsEvent::Connected) => self.state = ConnectionState::Connected,
                Ok(WsEvent::Disconnected) => {
                    self.state = ConnectionState::Disconnected;
                    self.cmd_tx = None;
                }
                Ok(WsEvent::Failed(message)) => {
                    self.state = ConnectionState::Error;
                    self.cmd_tx = None;
                    failure = Some(message);
                }
                Ok(WsEvent::Server(msg)) => match msg {
                    ServerMessage::Joined {
                        session,
                        peer_count,
                        latest,
                    } => {
                        log::info!("Joined relay session {session} with {peer_count} peers");
                        payloads.extend(latest);
                    }
                    ServerMessage::PeerJoined { peer_id } => {
                        log::debug!("Peer {peer_id} joined {}", self.session);
                    }
                    ServerMessage::PeerLeft { peer_id } => {
                        log::debug!("Peer {peer_id} left {}", self.session);
                    }
                    ServerMessage::Publish { payload, .. } => payloads.push(payload),
                    ServerMessage::Error { message } => {
                        log::warn!("Relay error: {message}");
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        match failure {
            Some(message) if payloads.is_empty() => Err(ReplicationError::Transport(message)),
            _ => Ok(payloads),
        }
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for RelayChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<WsEvent>) {
    log::info!("Relay thread: connecting to {url}");
    let (mut socket, response) = match connect(url) {
        Ok(connected) => connected,
        Err(e) => {
            log::error!("Relay connection failed: {e}");
            let _ = event_tx.send(WsEvent::Failed(format!("connection failed: {e}")));
            return;
        }
    };
    log::info!("Relay connected, status: {}", response.status());
    let _ = event_tx.send(WsEvent::Connected);

    // Short read timeout so the loop can interleave sends with reads
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    'outer: loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("Relay send error: {e}");
                        break 'outer;
                    }
                }
                Ok(WsCommand::Close) => {
                    let _ = socket.close(None);
                    break 'outer;
                }
                Err(TryRecvError::Disconnected) => break 'outer,
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(msg) => {
                    let _ = event_tx.send(WsEvent::Server(msg));
                }
                Err(e) => log::warn!("Failed to parse relay message: {e}"),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Relay closed the connection");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("Relay read error: {e}");
                break;
            }
        }
    }

    log::info!("Relay thread exiting");
    let _ = event_tx.send(WsEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            RelayChannel::connect("http://localhost:3030", "board"),
            Err(ReplicationError::InvalidUrl(_))
        ));
        assert!(matches!(
            RelayChannel::connect("not a url", "board"),
            Err(ReplicationError::InvalidUrl(_))
        ));
    }
}
