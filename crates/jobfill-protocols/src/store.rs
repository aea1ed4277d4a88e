//! Answer store protocol.
//!
//! The privileged context persists answers through an [`AnswerStore`].
//! Keys are [`FieldPath::store_key`](crate::FieldPath::store_key) strings,
//! never element identities.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::field::FieldSnapshot;

/// Keyed persistence for field answers.
///
/// Implementations must tolerate concurrent calls for distinct keys;
/// concurrent writes to the same key are last-write-wins.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Returns the backend ID.
    fn id(&self) -> &str;

    /// Fetch the snapshot stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<FieldSnapshot>, StoreError>;

    /// Insert or replace the snapshot stored under `key`.
    async fn set(&self, key: &str, snapshot: FieldSnapshot) -> Result<(), StoreError>;

    /// Remove the entry under `key`. Returns whether one existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Number of stored answers.
    async fn len(&self) -> Result<usize, StoreError>;
}
