//! Subscription protocol carried over JSON-RPC 2.0
//!
//! One-shot operations (queries and mutations) are plain JSON-RPC requests.
//! Subscriptions are a conversation of notifications keyed by a
//! client-chosen subscription id:
//!
//! ```text
//! client                                   server
//!   | -- subscription.start {id, payload} --> |
//!   | <-- subscription.data {id, result} ---- |  (zero or more)
//!   | <-- subscription.error {id, error} ---- |  (terminal)
//!   | <-- subscription.complete {id} -------- |  (terminal)
//!   | -- subscription.stop {id} ------------> |
//! ```
//!
//! The server forgets every subscription of a connection when that
//! connection drops. Re-issuing them after a reconnect is the link's job.

use crate::types::{FetchResult, OperationPayload};
use crate::JsonRpcErrorData;
use serde::{Deserialize, Serialize};

/// JSON-RPC method names used by the protocol
pub mod methods {
    /// Request: run a query or mutation, result is a `FetchResult`
    pub const EXECUTE: &str = "operation.execute";
    /// Notification (client to server): start a subscription
    pub const START: &str = "subscription.start";
    /// Notification (client to server): stop a subscription
    pub const STOP: &str = "subscription.stop";
    /// Notification (server to client): one subscription result
    pub const DATA: &str = "subscription.data";
    /// Notification (server to client): the subscription failed
    pub const ERROR: &str = "subscription.error";
    /// Notification (server to client): the subscription ended
    pub const COMPLETE: &str = "subscription.complete";
}

/// Params of `subscription.start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartParams {
    /// Client-chosen subscription id
    pub id: String,
    /// The operation to run
    pub payload: OperationPayload,
}

/// Params of `subscription.stop` and `subscription.complete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionIdParams {
    /// Subscription id
    pub id: String,
}

/// Params of `subscription.data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataParams {
    /// Subscription id
    pub id: String,
    /// The delivered result
    pub result: FetchResult,
}

/// Params of `subscription.error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorParams {
    /// Subscription id
    pub id: String,
    /// Why the subscription failed
    pub error: JsonRpcErrorData,
}

/// Whether a notification method belongs to the server side of the protocol
pub fn is_subscription_event(method: &str) -> bool {
    matches!(method, methods::DATA | methods::ERROR | methods::COMPLETE)
}
