//! Answer-store methods carried over the bridge.

use std::sync::Arc;

use tracing::debug;

use jobfill_protocols::{
    methods, AnswerStore, BridgeError, FieldPath, FieldSnapshot, HandlerError,
};

use crate::client::RpcClient;
use crate::server::RpcServer;

/// Expose `store` through `saveAnswer`, `getAnswer` and `deleteAnswer`.
pub fn register_answer_methods(server: &RpcServer, store: Arc<dyn AnswerStore>) {
    let save_store = store.clone();
    server.register_typed(methods::SAVE_ANSWER, move |snapshot: FieldSnapshot| {
        let store = save_store.clone();
        async move {
            let key = snapshot.store_key();
            store.set(&key, snapshot).await?;
            Ok::<bool, HandlerError>(true)
        }
    });

    let get_store = store.clone();
    server.register_typed(methods::GET_ANSWER, move |path: FieldPath| {
        let store = get_store.clone();
        async move {
            let snapshot = store.get(&path.store_key()).await?;
            Ok::<Option<FieldSnapshot>, HandlerError>(snapshot)
        }
    });

    server.register_typed(methods::DELETE_ANSWER, move |path: FieldPath| {
        let store = store.clone();
        async move {
            let removed = store.delete(&path.store_key()).await?;
            debug!("deleteAnswer {} (existed: {})", path, removed);
            Ok::<bool, HandlerError>(true)
        }
    });

    debug!("Answer methods bound to '{}'", server.channel_name());
}

/// Typed front for the answer methods.
#[derive(Clone)]
pub struct AnswerClient {
    rpc: Arc<RpcClient>,
}

impl AnswerClient {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    pub async fn save_answer(&self, snapshot: &FieldSnapshot) -> Result<bool, BridgeError> {
        self.rpc.call(methods::SAVE_ANSWER, snapshot).await
    }

    /// Stored snapshot for `path`, or `None` when nothing was saved.
    pub async fn get_answer(&self, path: &FieldPath) -> Result<Option<FieldSnapshot>, BridgeError> {
        self.rpc.call(methods::GET_ANSWER, path).await
    }

    /// Remove the stored snapshot. Succeeds whether or not one existed.
    pub async fn delete_answer(&self, path: &FieldPath) -> Result<bool, BridgeError> {
        self.rpc.call(methods::DELETE_ANSWER, path).await
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

#[cfg(test)]
#[path = "answers_tests.rs"]
mod tests;
