use crate::device::DeviceError;
use crate::device::transport::{MiotTransport, PropertyResult, TransportError};
use crate::spec::{ActionId, PropertyId};
use crate::value::Value;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Device authentication token. Only the first five characters are ever printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Token(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0.get(..5).unwrap_or(&self.0)
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}...\"", self.prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub token: Token,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, token: Token) -> Self {
        Endpoint { host: host.into(), token }
    }
}

/// One physical device. Every RPC goes through the same lock, so at most one request is in flight per
/// device, and every RPC is bounded by `rpc_timeout`.
#[derive(Debug)]
pub struct Connection {
    endpoint: Endpoint,
    transport: Arc<dyn MiotTransport>,
    rpc_lock: Mutex<()>,
    rpc_timeout: Duration,
}

impl Connection {
    pub fn new(endpoint: Endpoint, transport: Arc<dyn MiotTransport>, rpc_timeout: Duration) -> Self {
        Connection {
            endpoint,
            transport,
            rpc_lock: Mutex::new(()),
            rpc_timeout,
        }
    }

    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn get_properties(&self, properties: &[PropertyId]) -> Result<Vec<PropertyResult>, DeviceError> {
        self.get_properties_with(properties, |results| results).await
    }

    /// Reads a batch and hands the outcome to `apply` before the next RPC to this device can start, so a write
    /// that lands right after the read cannot be overwritten by the older values.
    pub async fn get_properties_with<R>(
        &self,
        properties: &[PropertyId],
        apply: impl FnOnce(Result<Vec<PropertyResult>, DeviceError>) -> R,
    ) -> R {
        let _guard = self.rpc_lock.lock().await;
        let results = self
            .call("get_properties", self.transport.get_properties(&self.endpoint, properties))
            .await
            .and_then(|results| {
                if results.len() == properties.len() {
                    Ok(results)
                } else {
                    Err(self.unreachable(TransportError::Protocol(format!(
                        "received {} results for {} properties",
                        results.len(),
                        properties.len()
                    ))))
                }
            });
        apply(results)
    }

    pub async fn set_property(&self, property: PropertyId, value: &Value) -> Result<bool, DeviceError> {
        let _guard = self.rpc_lock.lock().await;
        self.call("set_property", self.transport.set_property(&self.endpoint, property, value)).await
    }

    pub async fn call_action(&self, action: ActionId, params: &[Value]) -> Result<bool, DeviceError> {
        let _guard = self.rpc_lock.lock().await;
        self.call("call_action", self.transport.call_action(&self.endpoint, action, params)).await
    }

    // Callers hold the RPC lock. No retries here, a retried write could repeat its side effect on the device
    #[instrument(skip(self, request), fields(host = %self.endpoint.host))]
    async fn call<T, F>(&self, operation: &'static str, request: F) -> Result<T, DeviceError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        debug!("Sending {}...", operation);

        match timeout(self.rpc_timeout, request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(self.unreachable(error)),
            Err(_) => Err(DeviceError::Unreachable {
                host: self.endpoint.host.clone(),
                reason: format!("{} timed out after {:?}", operation, self.rpc_timeout),
            }),
        }
    }

    fn unreachable(&self, error: TransportError) -> DeviceError {
        DeviceError::Unreachable {
            host: self.endpoint.host.clone(),
            reason: error.to_string(),
        }
    }
}
