//! Fan-out engine
//!
//! A single consumer owns the registry. Sessions hand it events through
//! `EventForwarder` (installed as the transport's interceptor) and it
//! processes them strictly one at a time:
//! - Subscribe: register special subscriptions
//! - Publish: match every registered filter under the topic and republish
//!   the whole message to each matching client's own topic
//! - Goodbye: drop every record the session holds
//!
//! Nothing that goes wrong while handling an event stops the loop; the
//! failure is logged and that event is abandoned.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::SessionId;
use crate::fanout::options::SubscribeOptions;
use crate::fanout::processor::{ClientMessageProcessor, MessageProcessor};
use crate::fanout::registry::Registry;
use crate::messaging::message::PAYLOAD_KEY;
use crate::transport::{Publisher, Receipt, SessionEvent, SessionInterceptor};

#[derive(Debug)]
struct Envelope {
    event: SessionEvent,
    taken: oneshot::Sender<()>,
}

/// Producer side of the engine's event queue.
#[derive(Debug, Clone)]
pub struct EventForwarder {
    tx: UnboundedSender<Envelope>,
}

/// Consumer side of the engine's event queue.
#[derive(Debug)]
pub struct EventQueue {
    rx: UnboundedReceiver<Envelope>,
}

/// Creates the engine's event queue and the interceptor feeding it.
pub fn event_channel() -> (EventForwarder, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventForwarder { tx }, EventQueue { rx })
}

impl SessionInterceptor for EventForwarder {
    fn intercept(&self, event: SessionEvent) -> Receipt {
        let (taken, rx) = oneshot::channel();
        if self.tx.send(Envelope { event, taken }).is_err() {
            warn!("fan-out engine stopped, event dropped");
            return Receipt::ready();
        }
        Receipt::pending(rx)
    }
}

pub struct FanoutEngine {
    registry: Registry,
    publisher: Arc<dyn Publisher>,
    processor: Arc<dyn MessageProcessor>,
}

impl FanoutEngine {
    /// Engine storing subscriptions in `registry` and publishing through `publisher`.
    pub fn new(registry: Registry, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            registry,
            publisher,
            processor: Arc::new(ClientMessageProcessor),
        }
    }

    /// Replaces the default message processor.
    pub fn with_processor(mut self, processor: Arc<dyn MessageProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// The registry the engine writes to.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Consumes events until every forwarder is dropped.
    pub async fn run(self, mut queue: EventQueue) {
        while let Some(Envelope { event, taken }) = queue.rx.recv().await {
            let _ = taken.send(());
            self.handle(event).await;
        }
        info!("event queue closed, fan-out engine stopping");
    }

    /// Runs the engine on a background task.
    pub fn spawn(self, queue: EventQueue) -> JoinHandle<()> {
        tokio::spawn(self.run(queue))
    }

    /// Applies one session event.
    pub async fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::Subscribe {
                topic,
                client_id,
                options,
            } => self.on_subscribe(&topic, client_id, &options),
            SessionEvent::Publish { topic, arguments } => self.on_publish(&topic, &arguments).await,
            SessionEvent::Goodbye { client_id } => self.on_goodbye(client_id),
        }
    }

    fn on_subscribe(&self, topic: &str, client_id: SessionId, options: &Value) {
        let mut options = match SubscribeOptions::decode(options) {
            Ok(options) => options,
            Err(e) => {
                warn!(client_id, topic, "discarding subscribe: {e}");
                return;
            }
        };

        if !options.is_special() {
            return;
        }

        if let Err(e) = options.bind(topic, client_id) {
            warn!(client_id, "discarding special subscribe: {e}");
            return;
        }

        match self.registry.register(&options) {
            Ok(()) => debug!(
                client_id,
                base_topic = %options.base_topic,
                topic_id = %options.topic_id,
                "registered special subscription"
            ),
            Err(e) => error!(client_id, topic, "failed to register subscription: {e}"),
        }
    }

    async fn on_publish(&self, topic: &str, arguments: &[Value]) {
        let Some(Value::String(raw)) = arguments.first() else {
            return;
        };

        if let Err(e) = self.processor.process(raw) {
            error!(topic, "message processing failed: {e}");
        }

        let record_keys = match self.registry.members(topic) {
            Ok(keys) => keys,
            Err(e) => {
                error!(topic, "failed to load subscribers: {e}");
                return;
            }
        };

        let message: Value = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(topic, "published message is not json: {e}");
                return;
            }
        };

        let Some(Value::Object(payload)) = message.get(PAYLOAD_KEY) else {
            return;
        };

        debug!(topic, subscribers = record_keys.len(), "sending out special messages");
        for record_key in &record_keys {
            self.deliver(record_key, payload, &message).await;
        }
    }

    async fn deliver(&self, record_key: &str, payload: &Map<String, Value>, message: &Value) {
        let filter = match self.registry.filter_of(record_key) {
            Ok(filter) => filter,
            Err(e) => {
                error!(record_key, "failed to load filter: {e}");
                return;
            }
        };

        if !filter.passes(payload) {
            debug!(record_key, %filter, "filtered out");
            return;
        }

        let target = match self.registry.topic_of(record_key) {
            Ok(target) => target,
            Err(e) => {
                error!(record_key, "failed to load topic: {e}");
                return;
            }
        };

        // Left behind by a goodbye: member of the set, but no record.
        if target.is_empty() {
            debug!(record_key, "no stored topic, skipping");
            return;
        }

        debug!(record_key, %target, "publishing to special topic");
        if let Err(e) = self.publisher.publish(&target, vec![message.clone()]).await {
            error!(record_key, %target, "failed to publish: {e}");
        }
    }

    fn on_goodbye(&self, client_id: SessionId) {
        if let Err(e) = self.registry.forget(client_id) {
            error!(client_id, "failed to drop subscription records: {e}");
        }
    }
}
