//! In-memory answer store for jobfill.
//!
//! Backs the privileged context in tests and in the CLI. Entries live for
//! the lifetime of the process.

mod backend;

pub use backend::MemoryAnswerStore;
