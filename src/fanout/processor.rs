use tracing::debug;

use crate::messaging::Message;
use crate::utils::error::ProcessError;

/// Hook run on the raw string of every publish before fan-out.
pub trait MessageProcessor: Send + Sync {
    fn process(&self, raw: &str) -> Result<(), ProcessError>;
}

/// Checks that a published string is a backend message and traces it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientMessageProcessor;

impl MessageProcessor for ClientMessageProcessor {
    fn process(&self, raw: &str) -> Result<(), ProcessError> {
        let message: Message = raw.parse()?;
        debug!(
            app = %message.app,
            kind = %message.kind,
            operation = %message.operation,
            "processing client message"
        );
        Ok(())
    }
}
