//! RPC gateway
//!
//! Four procedures, `data.read`, `data.create`, `data.remove` and
//! `data.update`, each taking one `Message` argument and delegating to the
//! backend data API. Calls never touch the fan-out path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::broker::Procedure;
use crate::messaging::Message;
use crate::rpc::api_client::{DataApi, Scope};
use crate::transport::LocalClient;
use crate::utils::error::{RpcError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOp {
    Read,
    Create,
    Remove,
    Update,
}

impl DataOp {
    pub const ALL: [DataOp; 4] = [DataOp::Read, DataOp::Create, DataOp::Remove, DataOp::Update];

    /// The transport procedure name, e.g. `data.read`.
    pub fn procedure_name(self) -> &'static str {
        match self {
            DataOp::Read => "data.read",
            DataOp::Create => "data.create",
            DataOp::Remove => "data.remove",
            DataOp::Update => "data.update",
        }
    }
}

pub struct DataGateway {
    api: Arc<dyn DataApi>,
}

impl DataGateway {
    /// Creates a gateway forwarding calls to `api`.
    pub fn new(api: Arc<dyn DataApi>) -> Self {
        Self { api }
    }

    /// Registers every data procedure on the relay's local session.
    pub fn register(self: Arc<Self>, client: &LocalClient) -> Result<(), TransportError> {
        for op in DataOp::ALL {
            client.register(
                op.procedure_name(),
                Arc::new(DataProcedure {
                    gateway: self.clone(),
                    op,
                }),
            )?;
        }
        Ok(())
    }

    /// Decodes the call's first argument and runs `op` on it.
    pub async fn call(&self, op: DataOp, args: Vec<Value>) -> Result<Value, RpcError> {
        let message = decode(args)?;
        info!(procedure = op.procedure_name(), app = %message.app, kind = %message.kind, "rpc call");
        match op {
            DataOp::Read => self.read(&message).await,
            DataOp::Create => self.create(&message).await,
            DataOp::Remove => self.remove(&message).await,
            DataOp::Update => self.update(&message).await,
        }
    }

    /// One record when `pld._id` is a string, otherwise the whole collection.
    pub async fn read(&self, message: &Message) -> Result<Value, RpcError> {
        let scope = Scope::of(message);
        let result = match message.id() {
            Some(id) => self.api.get_item(&scope, &message.kind, id).await?,
            None => self.api.get_items(&scope, &message.kind).await?,
        };
        Ok(result)
    }

    /// Returns the id the backend assigned.
    pub async fn create(&self, message: &Message) -> Result<Value, RpcError> {
        let created = self
            .api
            .create_item(&Scope::of(message), &message.kind, &message.payload)
            .await?;
        Ok(created.get("_id").cloned().unwrap_or(Value::Null))
    }

    /// Deletes the record named by `pld._id` and returns that id.
    pub async fn remove(&self, message: &Message) -> Result<Value, RpcError> {
        let id = required_id(message)?;
        self.api
            .delete_item(&Scope::of(message), &message.kind, id)
            .await?;
        Ok(Value::String(id.to_string()))
    }

    /// Replaces the record named by `pld._id` with `pld` and returns the id.
    pub async fn update(&self, message: &Message) -> Result<Value, RpcError> {
        let id = required_id(message)?;
        self.api
            .update_item(&Scope::of(message), &message.kind, id, &message.payload)
            .await?;
        Ok(Value::String(id.to_string()))
    }
}

fn decode(args: Vec<Value>) -> Result<Message, RpcError> {
    let first = args.into_iter().next().ok_or(RpcError::MissingArgument)?;
    Ok(Message::from_value(first)?)
}

fn required_id(message: &Message) -> Result<&str, RpcError> {
    message
        .id()
        .ok_or_else(|| RpcError::MalformedPayload(Value::Object(message.payload.clone()).to_string()))
}

struct DataProcedure {
    gateway: Arc<DataGateway>,
    op: DataOp,
}

#[async_trait]
impl Procedure for DataProcedure {
    async fn invoke(&self, args: Vec<Value>) -> Result<Vec<Value>, String> {
        match self.gateway.call(self.op, args).await {
            Ok(value) => Ok(vec![value]),
            Err(e) => {
                match &e {
                    RpcError::Api(_) => error!(procedure = self.op.procedure_name(), "{e}"),
                    _ => warn!(procedure = self.op.procedure_name(), "{e}"),
                }
                Err(e.to_string())
            }
        }
    }
}
