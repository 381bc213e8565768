//! BoxLink WebSocket Relay Server
//!
//! Forwards snapshot payloads between peers that joined the same session.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type`:
//! ```json
//! { "type": "join", "session": "team-board" }
//! { "type": "publish", "payload": "<serialized snapshot envelope>" }
//! { "type": "leave" }
//! ```
//! The server answers a join with `joined` (including the session's latest
//! payload, if any) and forwards `publish`, `peer_joined` and `peer_left`
//! to the other members. A sender never receives its own messages.

pub mod relay;

pub use relay::{RelayState, router};
