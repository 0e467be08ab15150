//! The relay's own session on the broker.
//!
//! The queue bridge and the fan-out engine publish through it and the RPC
//! gateway registers its procedures on it. Its publishes are intercepted
//! like any other session's, but it never waits for the receipt: the
//! fan-out engine publishes from inside the consumer that takes receipts.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::broker::{Procedure, SharedBroker, lock};
use crate::transport::Publisher;
use crate::transport::interceptor::{SessionEvent, SessionInterceptor};
use crate::utils::error::TransportError;

#[derive(Clone)]
pub struct LocalClient {
    broker: SharedBroker,
    interceptor: Arc<dyn SessionInterceptor>,
}

impl LocalClient {
    /// Local session on `broker` whose publishes go through `interceptor`.
    pub fn new(broker: SharedBroker, interceptor: Arc<dyn SessionInterceptor>) -> Self {
        Self {
            broker,
            interceptor,
        }
    }

    /// Registers a procedure callable by every session.
    pub fn register(
        &self,
        name: &str,
        procedure: Arc<dyn Procedure>,
    ) -> Result<(), TransportError> {
        lock(&self.broker).register_procedure(name, procedure)?;
        debug!(procedure = name, "registered procedure");
        Ok(())
    }
}

#[async_trait]
impl Publisher for LocalClient {
    async fn publish(&self, topic: &str, args: Vec<Value>) -> Result<(), TransportError> {
        drop(self.interceptor.intercept(SessionEvent::Publish {
            topic: topic.to_string(),
            arguments: args.clone(),
        }));

        let delivered = lock(&self.broker).publish(topic, &args, None)?;
        debug!(topic, delivered, "local publish");
        Ok(())
    }
}
