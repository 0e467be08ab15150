//! The `messaging` module holds the backend message model and the topic
//! codec shared by the fan-out engine, the queue bridge and the RPC gateway.

pub mod message;
pub mod topic;

pub use message::{Message, MessageOptions};
pub use topic::{build_topic, build_topic_arbitrary, split_special_topic};

#[cfg(test)]
mod tests;
