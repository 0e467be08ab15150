//! The broker is the in-process pub/sub router behind the WebSocket
//! transport: it tracks sessions, topic subscriptions and registered
//! procedures, and delivers `event` frames to subscribers.

pub mod engine;
pub mod procedure;
pub mod topic;

pub use engine::{Broker, SharedBroker, lock};
pub use procedure::Procedure;
