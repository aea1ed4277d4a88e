//! Server role: dispatches requests to named handlers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use jobfill_protocols::{BridgeError, Envelope, HandlerError, RpcRequest, RpcResponse};

use crate::transport::MessageChannel;

/// Asynchronous handler bound to a method name.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value, HandlerError>;
}

#[async_trait]
impl<F, Fut> MethodHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn handle(&self, params: Value) -> Result<Value, HandlerError> {
        (self)(params).await
    }
}

type Handlers = HashMap<String, Arc<dyn MethodHandler>>;

/// Request dispatcher for the privileged context.
pub struct RpcServer {
    channel: MessageChannel,
    handlers: RwLock<Handlers>,
}

impl RpcServer {
    pub fn new(channel: MessageChannel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            handlers: RwLock::new(HashMap::new()),
        })
    }

    /// Bind `method` to `handler`, replacing any previous binding.
    pub fn register<H>(&self, method: impl Into<String>, handler: H)
    where
        H: MethodHandler + 'static,
    {
        let method = method.into();
        let previous = self.handlers.write().insert(method.clone(), Arc::new(handler));
        if previous.is_some() {
            debug!("Replaced handler for '{}'", method);
        } else {
            debug!("Registered handler for '{}'", method);
        }
    }

    /// Bind a handler taking and returning serde types.
    ///
    /// Params that fail to decode as `P` are answered with `ok: false`
    /// without reaching `f`.
    pub fn register_typed<P, R, F, Fut>(&self, method: impl Into<String>, f: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    {
        let f = Arc::new(f);
        self.register(method, move |params: Value| {
            let f = f.clone();
            async move {
                let params: P = serde_json::from_value(params)
                    .map_err(|e| HandlerError::InvalidParams(e.to_string()))?;
                let result = f(params).await?;
                Ok::<Value, HandlerError>(serde_json::to_value(result)?)
            }
        })
    }

    /// Names of all bound methods, sorted.
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// Start serving. Each request runs in its own task, so slow handlers
    /// never hold up others and responses may leave out of arrival order.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.channel.subscribe();
        let server = self.clone();
        info!("RPC server listening on '{}'", self.channel.name());

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let Envelope::Request(request) = envelope else {
                    continue;
                };
                let server = server.clone();
                tokio::spawn(async move {
                    let response = server.handle(request).await;
                    if let Err(e) = server.channel.post(&Envelope::Response(response)) {
                        debug!("Response not delivered: {}", e);
                    }
                });
            }
            debug!("RPC server on '{}' stopped", server.channel.name());
        })
    }

    /// Run one request through its handler and build the response.
    ///
    /// Never fails: unknown methods, handler errors and handler panics all
    /// come back as `ok: false`.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest {
            method,
            params,
            request_id,
        } = request;

        let handler = self.handlers.read().get(&method).cloned();
        let Some(handler) = handler else {
            warn!("Request {} for unregistered method '{}'", request_id, method);
            return RpcResponse::failure(request_id, BridgeError::NoSuchMethod(method).to_string());
        };

        debug!("Handling {} ({})", method, request_id);
        let outcome = tokio::spawn(async move { handler.handle(params).await }).await;

        match outcome {
            Ok(Ok(data)) => RpcResponse::success(request_id, data),
            Ok(Err(e)) => {
                warn!("Handler for '{}' failed: {}", method, e);
                RpcResponse::failure(request_id, e.to_string())
            }
            Err(e) => {
                warn!("Handler for '{}' aborted: {}", method, e);
                RpcResponse::failure(request_id, format!("handler for '{}' aborted", method))
            }
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
