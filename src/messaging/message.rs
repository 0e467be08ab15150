//! Message definitions
//!
//! `Message` is the event that crosses the backend/transport boundary: it
//! arrives as JSON on the job queue and as the single argument of an RPC
//! call. Wire keys are short (`op`, `pld`, `opts`) because the same JSON is
//! republished verbatim to browsers, whose filters match against `pld`.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::messaging::topic::build_topic;

/// Key of the nested object filters are evaluated against.
pub const PAYLOAD_KEY: &str = "pld";

/// Payload key carrying an entity id.
pub const ID_KEY: &str = "_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub app: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, rename = "op")]
    pub operation: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "pld", deserialize_with = "object_or_null")]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(default, rename = "opts")]
    pub options: MessageOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
}

impl Message {
    /// The transport topic of this message.
    ///
    /// Producers normally stamp `topic`; when they don't it is derived from
    /// the app, kind and operation.
    pub fn topic(&self) -> String {
        if self.topic.is_empty() {
            build_topic(&self.app, &self.kind, &self.operation)
        } else {
            self.topic.clone()
        }
    }

    /// `pld._id` when it is a string.
    pub fn id(&self) -> Option<&str> {
        self.payload.get(ID_KEY).and_then(Value::as_str)
    }

    /// `opts.notify`, false when absent.
    pub fn notify(&self) -> bool {
        self.options.notify.unwrap_or(false)
    }

    /// Decodes a message from parsed JSON.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl FromStr for Message {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

fn object_or_null<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
