//! Bridge errors.
//!
//! These never cross a context boundary as-is: the server turns handler
//! failures into `ok: false` envelopes, and the client rebuilds them as
//! [`BridgeError::Remote`].

use thiserror::Error;

use super::StoreError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Request {method} timed out after {after_ms}ms")]
    Timeout { method: String, after_ms: u64 },

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("No such method: {0}")]
    NoSuchMethod(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Failure raised by a server-side method handler.
///
/// Only its display text travels back to the caller.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}
