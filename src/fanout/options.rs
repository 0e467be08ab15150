use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::client::SessionId;
use crate::fanout::filter::Filter;
use crate::fanout::registry::fields;
use crate::messaging::split_special_topic;
use crate::utils::error::{DecodeError, TopicError};

/// Options of a subscribe request.
///
/// Only `filter` comes from the caller; a subscription that carries one is
/// special. The remaining fields are filled in by `bind` when the
/// subscription is registered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubscribeOptions {
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(skip)]
    pub base_topic: String,
    #[serde(skip)]
    pub topic: String,
    #[serde(skip)]
    pub client_id: SessionId,
    #[serde(skip)]
    pub topic_id: String,
}

impl SubscribeOptions {
    /// `null` decodes as plain options; anything but an object is rejected.
    pub fn decode(options: &Value) -> Result<Self, DecodeError> {
        match options {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => Ok(Self::deserialize(options)?),
            other => Err(DecodeError::OptionsNotObject(other.to_string())),
        }
    }

    /// True when the subscription carries a filter.
    pub fn is_special(&self) -> bool {
        self.filter.is_some()
    }

    /// Fills in the base topic, suffix and session from the subscribed topic.
    pub fn bind(&mut self, topic: &str, client_id: SessionId) -> Result<(), TopicError> {
        let (base_topic, topic_id) = split_special_topic(topic)?;
        self.base_topic = base_topic.to_string();
        self.topic_id = topic_id.to_string();
        self.topic = topic.to_string();
        self.client_id = client_id;
        Ok(())
    }

    /// Registry key of this subscription: `{session}:{base_topic}`.
    ///
    /// A session has one record per base topic; subscribing to the same base
    /// topic again replaces it.
    pub fn record_key(&self) -> String {
        format!("{}:{}", self.client_id, self.base_topic)
    }

    /// The registry record for this subscription.
    pub fn record(&self) -> HashMap<String, String> {
        let filter = self.filter.clone().unwrap_or_default();
        HashMap::from([
            (fields::BASE_TOPIC.to_string(), self.base_topic.clone()),
            (fields::TOPIC.to_string(), self.topic.clone()),
            (fields::CLIENT_ID.to_string(), self.client_id.to_string()),
            (fields::TOPIC_ID.to_string(), self.topic_id.clone()),
            (fields::FILTER.to_string(), filter.to_string()),
        ])
    }
}
