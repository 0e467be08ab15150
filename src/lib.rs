//! # Realtime relay
//!
//! `realtime-relay` sits between a backend job queue and browser sessions
//! connected over WebSockets. Jobs published by the backend are republished
//! on the transport, and every publish is copied to the private topic of each
//! session whose registered filter matches the message payload. Sessions can
//! also call four data procedures that are forwarded to the backend data API.
//!
//! ## Core Modules
//!
//! - `broker`: The in-process router that tracks sessions, topics and procedures.
//! - `client`: Represents a connected WebSocket session.
//! - `config`: Handles loading and managing relay configuration.
//! - `fanout`: Filtered subscriptions, the registry and the fan-out engine.
//! - `messaging`: The backend `Message` and the topic codec.
//! - `persistence`: The key-value store behind the registry (sled).
//! - `queue`: Queue sources and the bridge onto the transport.
//! - `rpc`: The backend data API client and the RPC gateway.
//! - `transport`: Manages the WebSocket server and communication with sessions.
//! - `utils`: Contains shared utilities, such as error handling and logging.

pub mod broker;
pub mod client;
pub mod config;
pub mod fanout;
pub mod messaging;
pub mod persistence;
pub mod queue;
pub mod rpc;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
