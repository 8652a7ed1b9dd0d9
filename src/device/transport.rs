use crate::device::Endpoint;
use crate::spec::{ActionId, PropertyId};
use crate::value::Value;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// Outcome of reading a single property in a batched read.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyResult {
    Value(Value),
    Error { code: i32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Request/response channel to a physical device. Implementations talk the miIO protocol or proxy
/// through a gateway; the core only relies on these three calls.
#[async_trait]
pub trait MiotTransport: Debug + Send + Sync {
    /// Reads `properties` in one round trip. The result holds one entry per requested property, in order.
    async fn get_properties(&self, endpoint: &Endpoint, properties: &[PropertyId]) -> Result<Vec<PropertyResult>, TransportError>;

    async fn set_property(&self, endpoint: &Endpoint, property: PropertyId, value: &Value) -> Result<bool, TransportError>;

    async fn call_action(&self, endpoint: &Endpoint, action: ActionId, params: &[Value]) -> Result<bool, TransportError>;
}
