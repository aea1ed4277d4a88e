//! Client role: issues requests and correlates responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use jobfill_protocols::{BridgeError, Envelope, RpcRequest, RpcResponse};

use crate::transport::{ChannelReceiver, MessageChannel};

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<RpcResponse>>>>;

/// Client tuning.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a request may wait for its response. `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// RPC client for the unprivileged context.
///
/// Any number of requests may be in flight at once; each is resolved by the
/// response carrying its request id, whatever order responses arrive in.
pub struct RpcClient {
    channel: MessageChannel,
    config: ClientConfig,
    pending: Pending,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl RpcClient {
    /// Create a client and start listening for responses.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(channel: MessageChannel, config: ClientConfig) -> Self {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let rx = channel.subscribe();

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(rx, pending).await;
            })
        };

        debug!("RPC client attached to '{}'", channel.name());

        Self {
            channel,
            config,
            pending,
            _recv_task: recv_task,
        }
    }

    async fn receive_loop(mut rx: ChannelReceiver, pending: Pending) {
        while let Some(envelope) = rx.recv().await {
            let Envelope::Response(response) = envelope else {
                continue;
            };
            let waiter = pending.lock().remove(&response.request_id);
            match waiter {
                Some(tx) => {
                    trace!("Resolved request {}", response.request_id);
                    let _ = tx.send(response);
                }
                None => debug!("No pending request for response {}", response.request_id),
            }
        }
        // Bus gone: dropping the senders wakes every waiter.
        pending.lock().clear();
    }

    /// Send a request and wait for its response envelope.
    pub async fn send(&self, method: &str, params: Value) -> Result<RpcResponse, BridgeError> {
        let request = RpcRequest::new(method, params);
        let request_id = request.request_id.clone();

        let (tx, rx) = oneshot::channel();
        let _slot = PendingSlot::insert(&self.pending, request_id.clone(), tx);

        self.channel.post(&Envelope::Request(request))?;
        trace!("Sent {} ({})", method, request_id);

        let received = match self.config.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!("Request {} ({}) timed out", method, request_id);
                    return Err(BridgeError::Timeout {
                        method: method.to_string(),
                        after_ms: limit.as_millis() as u64,
                    });
                }
            },
            None => rx.await,
        };

        received.map_err(|_| BridgeError::ChannelClosed)
    }

    /// Call a method with typed params and decode the result.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, BridgeError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let data = self.send(method, params).await?.into_result()?;
        Ok(serde_json::from_value(data)?)
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

/// Removes a pending entry when the waiting call finishes or is dropped.
struct PendingSlot<'a> {
    pending: &'a Pending,
    request_id: String,
}

impl<'a> PendingSlot<'a> {
    fn insert(pending: &'a Pending, request_id: String, tx: oneshot::Sender<RpcResponse>) -> Self {
        pending.lock().insert(request_id.clone(), tx);
        Self {
            pending,
            request_id,
        }
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.request_id);
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
