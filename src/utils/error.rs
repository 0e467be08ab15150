//! The `error` module defines the error types used within the relay.
//!
//! Each subsystem has its own enum so callers can decide which failures to
//! absorb (the fan-out engine and the queue bridge log and move on) and
//! which to surface (the RPC gateway returns them to the caller).

use thiserror::Error;

/// Failures of the shared key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("stored value for '{key}' is not valid UTF-8")]
    InvalidUtf8 { key: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic '{0}' has no unique suffix")]
    MissingSuffix(String),

    #[error("topic '{0}' has an empty base topic")]
    EmptyBase(String),
}

/// Malformed JSON or options crossing a boundary into the relay.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subscribe options must be an object, got {0}")]
    OptionsNotObject(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("procedure '{0}' is already registered")]
    ProcedureExists(String),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection failed: {0}")]
    Connect(#[from] tungstenite::Error),

    #[error("failed to encode queue frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("queue source already consumed")]
    Exhausted,
}

/// Failures talking to the backend data API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    #[error("invalid path segment '{0}'")]
    InvalidSegment(String),
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("missing call argument")]
    MissingArgument,

    #[error("invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Incorrect payload, {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("message is not decodable: {0}")]
    Undecodable(#[from] serde_json::Error),
}
