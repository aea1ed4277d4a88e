//! DashMap-backed answer store.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use jobfill_protocols::{AnswerStore, FieldSnapshot, StoreError};

/// Answer store keeping snapshots in a concurrent map.
pub struct MemoryAnswerStore {
    id: String,
    entries: DashMap<String, FieldSnapshot>,
}

impl MemoryAnswerStore {
    pub fn new() -> Self {
        Self::with_id("memory")
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: DashMap::new(),
        }
    }

    /// Create a store pre-populated with `snapshots`. Later entries win
    /// when two share a path.
    pub fn seeded(snapshots: impl IntoIterator<Item = FieldSnapshot>) -> Self {
        let store = Self::new();
        for snapshot in snapshots {
            store.entries.insert(snapshot.store_key(), snapshot);
        }
        store
    }

    /// Copy of every stored snapshot, in key order.
    pub fn snapshots(&self) -> Vec<FieldSnapshot> {
        let mut entries: Vec<(String, FieldSnapshot)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, snapshot)| snapshot).collect()
    }
}

impl Default for MemoryAnswerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerStore for MemoryAnswerStore {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get(&self, key: &str) -> Result<Option<FieldSnapshot>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, snapshot: FieldSnapshot) -> Result<(), StoreError> {
        debug!("Storing answer under {}", key);
        self.entries.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
