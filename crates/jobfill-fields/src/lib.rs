//! # jobfill Fields
//!
//! Discovery and automation of job-application form fields.
//!
//! A [`Discoverer`] scans a [`Page`] with the locator of every kind in a
//! [`KindRegistry`] and attaches one [`FieldAutomation`] per matching
//! element. Each automation talks to the answer store through an
//! [`AnswerClient`](jobfill_bridge::AnswerClient) and reports changes on
//! its own [`RefreshChannel`].

pub mod automation;
pub mod discovery;
pub mod document;
pub mod events;
pub mod kind;
pub mod kinds;
mod locator;

pub use automation::{FieldAutomation, FieldState, SaveStatus};
pub use discovery::{Discoverer, DEFAULT_MARKER_ATTRIBUTE};
pub use document::{DocumentEvent, DocumentTree, NodeId, NodeSpec, Page};
pub use events::{RefreshChannel, RefreshEvent, RefreshSubscription};
pub use kind::{FieldKind, KindRegistry};
pub use kinds::{Checkbox, PasswordInput, TextInput};
