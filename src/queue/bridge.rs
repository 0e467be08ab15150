//! Queue bridge
//!
//! Every delivery is handled in its own task. Only the publish call is
//! serialized, by a mutex owned by the bridge; it does not order deliveries
//! against sessions publishing on the transport.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::messaging::Message;
use crate::queue::{Deliveries, QueueSource};
use crate::transport::Publisher;

#[derive(Clone)]
pub struct QueueBridge {
    publisher: Arc<dyn Publisher>,
    publish_lock: Arc<Mutex<()>>,
}

impl QueueBridge {
    /// Creates a bridge republishing through `publisher`.
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self {
            publisher,
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Republishes one raw delivery. Undecodable messages are dropped.
    pub async fn handle_delivery(&self, raw: String) {
        debug!("processing queue message: {raw}");

        let message: Message = match raw.parse() {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping undecodable queue message: {e}");
                return;
            }
        };
        let topic = message.topic();

        let published = {
            let _guard = self.publish_lock.lock().await;
            self.publisher
                .publish(&topic, vec![Value::String(raw)])
                .await
        };

        if let Err(e) = published {
            error!(%topic, "failed to publish queue message: {e}");
        }
    }

    /// Handles deliveries concurrently until the stream ends.
    pub async fn run(self, mut deliveries: Deliveries) {
        let mut in_flight = Vec::new();
        while let Some(raw) = deliveries.next().await {
            let bridge = self.clone();
            in_flight.push(tokio::spawn(async move { bridge.handle_delivery(raw).await }));
            in_flight.retain(|task: &JoinHandle<()>| !task.is_finished());
        }
        for task in in_flight {
            let _ = task.await;
        }
        info!("queue subscription ended");
    }

    /// Subscribes once to `subject` and bridges it for the process lifetime.
    pub fn spawn(self, source: Arc<dyn QueueSource>, subject: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            match source.subscribe(&subject).await {
                Ok(deliveries) => {
                    info!(%subject, "bridging queue subject");
                    self.run(deliveries).await;
                }
                Err(e) => error!(%subject, "queue subscription failed: {e}"),
            }
        })
    }
}
