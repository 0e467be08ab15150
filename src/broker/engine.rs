//! Broker engine
//!
//! Routing state for the transport:
//! - sessions and the channel each one is written through
//! - topic subscriptions
//! - procedures callable by sessions
//!
//! The API is synchronous and meant to sit behind `SharedBroker`. Callers
//! must not hold the lock across network I/O or `.await` points; delivery
//! only queues frames on per-session channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::procedure::Procedure;
use crate::broker::topic::Topic;
use crate::client::{Client, SessionId};
use crate::transport::message::ServerMessage;
use crate::utils::error::TransportError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Locks the broker, recovering the state if a holder panicked.
pub fn lock(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct Broker {
    pub topics: HashMap<String, Topic>,
    pub clients: HashMap<SessionId, Client>,
    procedures: HashMap<String, Arc<dyn Procedure>>,
}

impl Broker {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new broker behind a shared lock.
    pub fn shared() -> SharedBroker {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Adds a session, replacing any with the same id.
    pub fn register_client(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    /// Drops a session without touching its subscriptions.
    pub fn remove_client(&mut self, client_id: &SessionId) {
        self.clients.remove(client_id);
    }

    /// Subscribes a session to a topic, creating the topic on first use.
    pub fn subscribe(&mut self, topic: &str, subscriber: SessionId) {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(subscriber);
    }

    /// Removes a subscription, dropping the topic once it is empty.
    pub fn unsubscribe(&mut self, topic: &str, subscriber: &SessionId) {
        if let Some(t) = self.topics.get_mut(topic) {
            t.unsubscribe(subscriber);
            if t.is_empty() {
                self.topics.remove(topic);
            }
        }
    }

    /// Sends an `event` frame to every subscriber of `topic` except the
    /// publishing session. Returns how many sessions it was queued for.
    pub fn publish(
        &self,
        topic: &str,
        args: &[Value],
        publisher: Option<SessionId>,
    ) -> Result<usize, TransportError> {
        let Some(subscribed) = self.topics.get(topic) else {
            debug!(topic, "no subscribers");
            return Ok(0);
        };

        let frame = ServerMessage::Event {
            topic: topic.to_string(),
            args: args.to_vec(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let ws_msg = WsMessage::text(serde_json::to_string(&frame)?);

        let mut delivered = 0;
        for sub_id in &subscribed.subscribers {
            if Some(*sub_id) == publisher {
                continue;
            }
            match self.clients.get(sub_id) {
                Some(client) if client.send(ws_msg.clone()) => delivered += 1,
                Some(_) => warn!(session = sub_id, topic, "session channel closed"),
                None => warn!(session = sub_id, topic, "no session registered"),
            }
        }
        Ok(delivered)
    }

    /// Registers `procedure` under `name`; fails if the name is taken.
    pub fn register_procedure(
        &mut self,
        name: &str,
        procedure: Arc<dyn Procedure>,
    ) -> Result<(), TransportError> {
        if self.procedures.contains_key(name) {
            return Err(TransportError::ProcedureExists(name.to_string()));
        }
        self.procedures.insert(name.to_string(), procedure);
        Ok(())
    }

    /// The procedure registered under `name`.
    pub fn procedure(&self, name: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures.get(name).cloned()
    }

    /// Removes a session and all of its subscriptions.
    pub fn cleanup_client(&mut self, client_id: &SessionId) {
        self.remove_client(client_id);

        self.topics.retain(|_, topic| {
            topic.unsubscribe(client_id);
            !topic.is_empty()
        });

        debug!(session = client_id, "cleaned up session");
    }
}
