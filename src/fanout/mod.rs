//! The `fanout` module is the subscription-and-fan-out core of the relay.
//!
//! Browsers register special subscriptions (a base topic plus a private
//! suffix, with a filter). Every publish on a base topic is matched against
//! the stored filters and copied to the private topic of each client whose
//! filter passes.

pub mod engine;
pub mod filter;
pub mod options;
pub mod processor;
pub mod registry;

pub use engine::{EventForwarder, EventQueue, FanoutEngine, event_channel};
pub use filter::Filter;
pub use options::SubscribeOptions;
pub use processor::{ClientMessageProcessor, MessageProcessor};
pub use registry::Registry;
