//! Session-event capture
//!
//! The transport hands every subscribe, publish and goodbye to an installed
//! `SessionInterceptor` before acting on it. The interceptor answers with a
//! `Receipt`; a remote session awaits it, so it stalls until the consumer
//! has taken the event.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::client::SessionId;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Subscribe {
        topic: String,
        client_id: SessionId,
        options: Value,
    },
    Publish {
        topic: String,
        arguments: Vec<Value>,
    },
    Goodbye {
        client_id: SessionId,
    },
}

/// Resolves once the interceptor's consumer has dequeued the event.
#[derive(Debug)]
pub struct Receipt(Option<oneshot::Receiver<()>>);

impl Receipt {
    /// A receipt that is already taken.
    pub fn ready() -> Self {
        Self(None)
    }

    /// A receipt taken when `rx` fires.
    pub fn pending(rx: oneshot::Receiver<()>) -> Self {
        Self(Some(rx))
    }

    /// Waits for the hand-off. A consumer that went away counts as taken.
    pub async fn taken(self) {
        if let Some(rx) = self.0 {
            let _ = rx.await;
        }
    }
}

pub trait SessionInterceptor: Send + Sync {
    fn intercept(&self, event: SessionEvent) -> Receipt;
}

/// Lets every event through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl SessionInterceptor for PassThrough {
    fn intercept(&self, _event: SessionEvent) -> Receipt {
        Receipt::ready()
    }
}
