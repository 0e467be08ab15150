//! The `transport` module is responsible for network communication with
//! browser sessions over WebSockets.
//!
//! It defines the JSON frame protocol, the interceptor capability through
//! which session events reach the fan-out engine, the relay's in-process
//! client, and the WebSocket server itself.

pub mod interceptor;
pub mod local;
pub mod message;
pub mod websocket;

use async_trait::async_trait;
use serde_json::Value;

use crate::utils::error::TransportError;

pub use interceptor::{PassThrough, Receipt, SessionEvent, SessionInterceptor};
pub use local::LocalClient;
pub use message::{ClientMessage, ServerMessage};
pub use websocket::start_websocket_server;

/// Publishes positional arguments to a topic on the transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, args: Vec<Value>) -> Result<(), TransportError>;
}

#[cfg(test)]
mod websocket_tests;
