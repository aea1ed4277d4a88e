//! # jobfill Protocols
//!
//! Shared data contracts for the jobfill workspace. Contains only types
//! and trait definitions - no implementations.
//!
//! - [`FieldPath`] / [`FieldSnapshot`] - logical address of a form field and its value
//! - [`RpcRequest`] / [`RpcResponse`] / [`Envelope`] - cross-context bridge messages
//! - [`Locator`] - structural query used to discover field containers
//! - [`AnswerStore`] - keyed persistence consumed by the privileged context

pub mod error;
pub mod field;
pub mod locator;
pub mod rpc;
pub mod store;

pub use error::{BridgeError, FieldError, HandlerError, StoreError};
pub use field::{Answer, FieldPath, FieldSnapshot};
pub use locator::{AttributeMatch, Locator};
pub use rpc::{methods, Envelope, Frame, RpcRequest, RpcResponse};
pub use store::AnswerStore;
