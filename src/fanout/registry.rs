//! Subscription registry
//!
//! Special subscriptions live in the shared store as:
//! - a set per base topic holding the record keys of its subscriptions
//! - a record per subscription, keyed `{session}:{base_topic}`, with the
//!   fields in [`fields`]
//! - a set per session (`session:{id}`) listing that session's record keys
//!
//! Reads of the membership set and of the records are separate store calls;
//! nothing groups them.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::client::SessionId;
use crate::fanout::filter::Filter;
use crate::fanout::options::SubscribeOptions;
use crate::persistence::KeyValueStore;
use crate::utils::error::StoreError;

pub mod fields {
    pub const BASE_TOPIC: &str = "baseTopic";
    pub const TOPIC: &str = "topic";
    pub const CLIENT_ID: &str = "clientId";
    pub const TOPIC_ID: &str = "topicId";
    pub const FILTER: &str = "filter";
}

/// Name of the set indexing a session's record keys.
pub fn session_index(client_id: SessionId) -> String {
    format!("session:{client_id}")
}

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn KeyValueStore>,
}

impl Registry {
    /// Registry over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Adds the subscription to its base topic and (over)writes its record.
    pub fn register(&self, options: &SubscribeOptions) -> Result<(), StoreError> {
        let key = options.record_key();
        self.store.add_member(&options.base_topic, &key)?;
        self.store.set_fields(&key, &options.record())?;
        self.store
            .add_member(&session_index(options.client_id), &key)
    }

    /// Record keys of every subscription on `base_topic`.
    pub fn members(&self, base_topic: &str) -> Result<BTreeSet<String>, StoreError> {
        self.store.list_members(base_topic)
    }

    /// One field of a record; empty when absent.
    pub fn field(&self, record_key: &str, field: &str) -> Result<String, StoreError> {
        self.store.get_field(record_key, field)
    }

    /// The private topic a record delivers to.
    pub fn topic_of(&self, record_key: &str) -> Result<String, StoreError> {
        self.field(record_key, fields::TOPIC)
    }

    /// The record's filter. A missing or unreadable filter is an empty one,
    /// which passes every payload.
    pub fn filter_of(&self, record_key: &str) -> Result<Filter, StoreError> {
        let raw = self.field(record_key, fields::FILTER)?;
        if raw.is_empty() {
            return Ok(Filter::default());
        }
        Ok(Filter::from_stored(&raw).unwrap_or_else(|e| {
            warn!(record_key, "unreadable stored filter, matching everything: {e}");
            Filter::default()
        }))
    }

    /// Deletes every record of the session and its index.
    ///
    /// The record keys stay in their base topics' membership sets, so stale
    /// members accumulate until something else removes them.
    // TODO: decide where stale memberships get pruned (on goodbye, on a
    // publish that finds no record, or in a periodic sweep).
    pub fn forget(&self, client_id: SessionId) -> Result<(), StoreError> {
        let index = session_index(client_id);
        for key in self.store.list_members(&index)? {
            self.store.remove_all(&key)?;
        }
        self.store.remove_all(&index)
    }
}
