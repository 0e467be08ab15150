//! The `client` module defines the representation of a transport session.
//!
//! It provides the `Client` struct, which encapsulates the id of a single
//! connected session and the channel for sending frames to it.

pub mod pubsub_client;
pub use pubsub_client::{Client, SessionId, next_session_id};

#[cfg(test)]
mod tests;
