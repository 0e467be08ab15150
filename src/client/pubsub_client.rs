use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

/// Numeric session identifier assigned by the transport.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Hands out session ids, starting at 1. Id 0 is never assigned.
pub fn next_session_id() -> SessionId {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Represents a connected WebSocket session on the relay.
///
/// The router pushes frames into `sender`; the session's send loop drains
/// them onto the socket.
#[derive(Debug)]
pub struct Client {
    /// Transport-assigned id, also used as the registry's client id.
    pub id: SessionId,

    /// Channel to send WebSocket frames to the session.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    /// Creates a session with the next free id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self::with_id(next_session_id(), sender)
    }

    /// Creates a session with a given id.
    pub fn with_id(id: SessionId, sender: UnboundedSender<WsMessage>) -> Self {
        Self { id, sender }
    }

    /// Queues a frame; returns false if the session has gone away.
    pub fn send(&self, frame: WsMessage) -> bool {
        self.sender.send(frame).is_ok()
    }
}
