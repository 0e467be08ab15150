//! Remote procedures
//!
//! A procedure is registered on the broker under a name (`data.read`, ...)
//! and invoked with the positional arguments of a `call` frame. Failures
//! carry a message that is sent back to the caller verbatim.

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Procedure: Send + Sync {
    async fn invoke(&self, args: Vec<Value>) -> Result<Vec<Value>, String>;
}
