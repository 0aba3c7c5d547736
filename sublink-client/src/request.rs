//! Request/response correlation
//!
//! Every outgoing request gets a numeric id and a oneshot channel. The
//! receive loop completes the channel when a response with the same id
//! arrives; the caller awaits the other end, optionally under a timeout.
//!
//! Responses never survive a reconnect (the server that would answer them
//! is gone), so the client fails all pending requests as soon as the
//! connection drops.

use sublink_core::{Error, Id, JsonRpcResponse, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

type ResponseSender = oneshot::Sender<Result<JsonRpcResponse>>;

/// Tracks requests that are waiting for a response
#[derive(Clone, Default)]
pub struct RequestManager {
    pending: Arc<Mutex<HashMap<Id, ResponseSender>>>,
    counter: Arc<AtomicI64>,
}

impl RequestManager {
    /// Create a new request manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique request id
    pub fn next_id(&self) -> Id {
        Id::Number(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a pending request and get the receiving end of its response
    pub async fn register(&self, id: Id) -> oneshot::Receiver<Result<JsonRpcResponse>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        rx
    }

    /// Complete the pending request matching the response id
    ///
    /// Returns `false` when nobody waits for this id (late or unknown response).
    pub async fn complete(&self, response: JsonRpcResponse) -> bool {
        match self.pending.lock().await.remove(&response.id) {
            Some(tx) => {
                let _ = tx.send(Ok(response));
                true
            }
            None => false,
        }
    }

    /// Forget a pending request (after a timeout or a failed send)
    pub async fn forget(&self, id: &Id) {
        self.pending.lock().await.remove(id);
    }

    /// Fail every pending request with the same error
    pub async fn fail_all(&self, error: Error) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(error.clone()));
        }
        count
    }

    /// Number of requests waiting for a response
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_unique() {
        let manager = RequestManager::new();
        assert_ne!(manager.next_id(), manager.next_id());
    }

    #[tokio::test]
    async fn test_register_and_complete() {
        let manager = RequestManager::new();
        let id = manager.next_id();

        let rx = manager.register(id.clone()).await;
        assert_eq!(manager.pending_count().await, 1);

        let delivered = manager
            .complete(JsonRpcResponse::success(serde_json::json!({"data": 1}), id))
            .await;
        assert!(delivered);
        assert_eq!(manager.pending_count().await, 0);

        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.result, Some(serde_json::json!({"data": 1})));
    }

    #[tokio::test]
    async fn test_unknown_response_is_ignored() {
        let manager = RequestManager::new();
        let delivered = manager
            .complete(JsonRpcResponse::success(serde_json::json!(null), Id::Number(99)))
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_forget() {
        let manager = RequestManager::new();
        let id = manager.next_id();
        let rx = manager.register(id.clone()).await;

        manager.forget(&id).await;

        assert_eq!(manager.pending_count().await, 0);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_fail_all() {
        let manager = RequestManager::new();
        let rx1 = manager.register(manager.next_id()).await;
        let rx2 = manager.register(manager.next_id()).await;

        assert_eq!(manager.fail_all(Error::ConnectionClosed).await, 2);

        assert_eq!(manager.pending_count().await, 0);
        assert!(matches!(rx1.await.unwrap(), Err(Error::ConnectionClosed)));
        assert!(matches!(rx2.await.unwrap(), Err(Error::ConnectionClosed)));
    }
}
