use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::SessionId;

/// Frames a session sends to the relay.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(default)]
        request: u64,
        topic: String,
        #[serde(default)]
        options: Value,
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        #[serde(default)]
        request: u64,
        topic: String,
    },
    #[serde(rename = "publish")]
    Publish {
        #[serde(default)]
        request: u64,
        topic: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    #[serde(rename = "call")]
    Call {
        request: u64,
        procedure: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    #[serde(rename = "goodbye")]
    Goodbye {},
}

/// Frames the relay sends to a session.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome { session: SessionId },
    #[serde(rename = "subscribed")]
    Subscribed { request: u64, topic: String },
    #[serde(rename = "unsubscribed")]
    Unsubscribed { request: u64, topic: String },
    #[serde(rename = "event")]
    Event {
        topic: String,
        args: Vec<Value>,
        timestamp: i64,
    },
    #[serde(rename = "result")]
    Result { request: u64, args: Vec<Value> },
    #[serde(rename = "error")]
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request: Option<u64>,
        message: String,
    },
}
