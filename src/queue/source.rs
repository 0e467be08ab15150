//! Queue sources
//!
//! - `WebSocketQueue` subscribes to a subject on an upstream pub/sub broker
//!   and yields the `payload` of each `message` frame.
//! - `ChannelQueue` is fed in-process through a tokio channel.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::queue::{Deliveries, QueueSource};
use crate::utils::error::QueueError;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum UpstreamRequest<'a> {
    #[serde(rename = "auth")]
    Auth { token: &'a str },
    #[serde(rename = "subscribe")]
    Subscribe { topic: &'a str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum UpstreamFrame {
    #[serde(rename = "message")]
    Message { topic: String, payload: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
pub struct WebSocketQueue {
    url: String,
    token: Option<String>,
}

impl WebSocketQueue {
    /// Queue reached at `url`, authenticating with `token` when set.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl QueueSource for WebSocketQueue {
    async fn subscribe(&self, subject: &str) -> Result<Deliveries, QueueError> {
        let (mut ws, _) = connect_async(self.url.as_str()).await?;

        if let Some(token) = &self.token {
            let auth = serde_json::to_string(&UpstreamRequest::Auth { token })?;
            ws.send(WsMessage::text(auth)).await?;
        }
        let subscribe = serde_json::to_string(&UpstreamRequest::Subscribe { topic: subject })?;
        ws.send(WsMessage::text(subscribe)).await?;
        debug!(url = %self.url, subject, "subscribed to queue");

        let deliveries = ws.filter_map(|frame| async move {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("queue connection error: {e}");
                    return None;
                }
            };
            let text = frame.to_text().ok()?;
            match serde_json::from_str::<UpstreamFrame>(text) {
                Ok(UpstreamFrame::Message { topic, payload }) => {
                    debug!(%topic, "queue delivery");
                    Some(payload)
                }
                Ok(UpstreamFrame::Other) => None,
                Err(e) => {
                    warn!("unrecognised queue frame: {e}");
                    None
                }
            }
        });
        Ok(deliveries.boxed())
    }
}

/// In-process queue. Every subject receives the same feed; it can be
/// subscribed to once.
#[derive(Debug)]
pub struct ChannelQueue {
    rx: Mutex<Option<UnboundedReceiver<String>>>,
}

impl ChannelQueue {
    /// Returns the feeding sender and the queue it feeds.
    pub fn channel() -> (UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                rx: Mutex::new(Some(rx)),
            },
        )
    }
}

#[async_trait]
impl QueueSource for ChannelQueue {
    async fn subscribe(&self, _subject: &str) -> Result<Deliveries, QueueError> {
        let rx = self
            .rx
            .lock()
            .map_err(|_| QueueError::Exhausted)?
            .take()
            .ok_or(QueueError::Exhausted)?;

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|raw| (raw, rx))
        })
        .boxed())
    }
}
