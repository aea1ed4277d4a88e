//! Error types for the jobfill protocol layer.

mod bridge;
mod field;
mod store;

pub use bridge::*;
pub use field::*;
pub use store::*;
