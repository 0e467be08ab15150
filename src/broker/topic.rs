//! Topic management
//!
//! A `Topic` holds the ids of the sessions subscribed to one topic name.
//! Duplicate subscriptions are a no-op.
//!
//! Callers must synchronize access (the broker lock) when modifying it.

use std::collections::HashSet;

use crate::client::SessionId;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<SessionId>,
}

impl Topic {
    /// Creates a topic with no subscribers.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Adds a subscriber.
    pub fn subscribe(&mut self, id: SessionId) {
        self.subscribers.insert(id);
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&mut self, id: &SessionId) {
        self.subscribers.remove(id);
    }

    /// True when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
