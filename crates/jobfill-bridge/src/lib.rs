//! Cross-context request/response bridge.
//!
//! Two execution contexts that share nothing but a [`MessageBus`] talk
//! through it: the privileged context runs an [`RpcServer`] with named
//! handlers, the page context issues calls through an [`RpcClient`].
//!
//! ```text
//! ┌──────────────┐   Frame{channel, JSON}   ┌────────────────┐
//! │  RpcClient   │ ───────────────────────► │   RpcServer    │
//! │ (page side)  │ ◄─────────────────────── │ (privileged)   │
//! └──────────────┘     correlated by id     └────────────────┘
//! ```
//!
//! Responses are matched to requests only by `requestId`; concurrent calls
//! may complete in any order.

mod answers;
mod client;
mod server;
mod transport;

pub use answers::{register_answer_methods, AnswerClient};
pub use client::{ClientConfig, RpcClient};
pub use server::{MethodHandler, RpcServer};
pub use transport::{ChannelReceiver, MessageBus, MessageChannel};
