//! Cross-context RPC message definitions.
//!
//! The two execution contexts share no memory; every request and response
//! travels as JSON text inside a [`Frame`]. The `requestId` is the only link
//! between a request and its eventual response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::BridgeError;

/// Methods exposed by the privileged context.
pub mod methods {
    /// Upsert the answer carried by a `FieldSnapshot`.
    pub const SAVE_ANSWER: &str = "saveAnswer";
    /// Fetch the stored snapshot for a `FieldPath`, or null.
    pub const GET_ANSWER: &str = "getAnswer";
    /// Remove the stored answer for a `FieldPath`.
    pub const DELETE_ANSWER: &str = "deleteAnswer";
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub request_id: String,
}

impl RpcRequest {
    /// Build a request with a fresh random id.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn success(request_id: impl Into<String>, data: Value) -> Self {
        Self {
            request_id: request_id.into(),
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Turn an `ok: false` envelope into [`BridgeError::Remote`].
    pub fn into_result(self) -> Result<Value, BridgeError> {
        if self.ok {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(BridgeError::Remote(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// Either side of an exchange, tagged so one channel can carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Envelope {
    Request(RpcRequest),
    Response(RpcResponse),
}

impl Envelope {
    pub fn encode(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(body: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Unit carried on the message bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel name shared by both contexts.
    pub channel: String,
    /// JSON-encoded [`Envelope`].
    pub body: String,
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
