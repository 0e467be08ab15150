//! The `queue` module connects the relay to the backend job queue.
//!
//! A `QueueSource` yields the raw JSON strings delivered on one subject and
//! the `QueueBridge` republishes each of them, unchanged, on the transport
//! topic named by the message itself.

pub mod bridge;
pub mod source;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::utils::error::QueueError;

pub use bridge::QueueBridge;
pub use source::{ChannelQueue, WebSocketQueue};

/// Raw message strings delivered on one subject.
pub type Deliveries = BoxStream<'static, String>;

#[async_trait]
pub trait QueueSource: Send + Sync {
    async fn subscribe(&self, subject: &str) -> Result<Deliveries, QueueError>;
}
