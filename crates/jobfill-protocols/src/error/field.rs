//! Field automation errors.

use thiserror::Error;

use super::BridgeError;

#[derive(Debug, Error)]
pub enum FieldError {
    /// A field kind broke the framework's contract (empty or duplicate
    /// type tag, missing control element). Fatal for the kind or instance
    /// concerned.
    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("{field_type} expects a {expected} answer")]
    AnswerType {
        field_type: String,
        expected: &'static str,
    },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}
