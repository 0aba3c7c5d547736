//! Wire types shared by the transport and the link
//!
//! Two families of types live here:
//!
//! 1. **JSON-RPC 2.0 envelopes**: requests, notifications and responses
//!    exchanged with the server over the WebSocket
//! 2. **Operation model**: the payload describing one logical request
//!    (query, mutation or subscription), the result shape the server
//!    streams back, and the event triple a subscription delivers
//!
//! # Operation Payloads
//!
//! An `OperationPayload` carries the already-printed request text plus its
//! variables. Turning a query document into text is the caller's concern;
//! the transport only ships strings.

use crate::error::{Error, JsonRpcErrorData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC 2.0 request ID
///
/// Serialized untagged, so `Id::Number(7)` goes on the wire as `7` and
/// `Id::String("a".into())` as `"a"`.
///
/// ```rust
/// use sublink_core::Id;
///
/// let id: Id = 42i64.into();
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// String identifier
    String(String),
    /// Numeric identifier, what the client generates
    Number(i64),
    /// Null identifier (only seen on error responses to unparseable requests)
    Null,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// JSON-RPC 2.0 request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Name of the remote method to invoke
    pub method: String,
    /// Optional parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Correlates the request with its response
    pub id: Id,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 notification (a request without an id, never answered)
///
/// The subscription protocol is built entirely out of notifications: the
/// client starts and stops subscriptions with them, the server pushes
/// results with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Notification method
    pub method: String,
    /// Optional parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC 2.0 notification
    pub fn new(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response message
///
/// Exactly one of `result` and `error` is present on a well-formed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Result on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorData>,
    /// Id of the request this answers
    pub id: Id,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(error: JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Check if this is a successful response
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Any single JSON-RPC 2.0 message
///
/// Variant order matters for the untagged decoding: a request has both
/// `method` and `id`, a notification only `method`, a response only `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request message
    Request(JsonRpcRequest),
    /// Notification message
    Notification(JsonRpcNotification),
    /// Response message
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Check if this is a request
    pub fn is_request(&self) -> bool {
        matches!(self, JsonRpcMessage::Request(_))
    }

    /// Check if this is a notification
    pub fn is_notification(&self) -> bool {
        matches!(self, JsonRpcMessage::Notification(_))
    }

    /// Check if this is a response
    pub fn is_response(&self) -> bool {
        matches!(self, JsonRpcMessage::Response(_))
    }
}

/// Kind of logical request an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Read-only request answered once
    Query,
    /// Write request answered once
    Mutation,
    /// Long-lived request answered by a stream of results
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
            OperationType::Subscription => "subscription",
        };
        f.write_str(name)
    }
}

/// The part of an operation that travels to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPayload {
    /// Printed request document
    pub query: String,
    /// Request variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
    /// Name of the operation to run when the document holds several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// What kind of request this is
    pub operation_type: OperationType,
}

impl OperationPayload {
    /// Create a payload with no variables and no operation name
    pub fn new(operation_type: OperationType, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
            operation_type,
        }
    }
}

/// One error entry inside a `FetchResult`
///
/// These are errors *reported in the result* (partial failures), not
/// transport failures, so they travel as values alongside `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchError {
    /// Description of the failure
    pub message: String,
    /// Path to the field that failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
    /// Server-specific extra information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl FetchError {
    /// Create an error entry with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

/// One result delivered for an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Result data, absent when the request failed entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Errors reported alongside (or instead of) data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FetchError>,
    /// Server-specific extra information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl FetchResult {
    /// A result carrying only data
    pub fn from_data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Whether the server reported any errors in this result
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Event delivered by a live subscription
///
/// After `Error` or `Complete` no further event is delivered for the same
/// subscription.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// A result
    Next(FetchResult),
    /// The subscription failed
    Error(Error),
    /// The subscription ended normally
    Complete,
}

impl SubscriptionEvent {
    /// Whether this event ends the subscription
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionEvent::Next(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_display() {
        assert_eq!(Id::String("sub".to_string()).to_string(), "\"sub\"");
        assert_eq!(Id::Number(42).to_string(), "42");
        assert_eq!(Id::Null.to_string(), "null");
    }

    #[test]
    fn test_notification_has_no_id() {
        let notif = JsonRpcNotification::new("subscription.stop", Some(json!({"id": "1"})));
        let json = serde_json::to_string(&notif).unwrap();
        assert!(json.contains("\"method\":\"subscription.stop\""));
        assert!(!json.contains("\"id\":1"));
    }

    #[test]
    fn test_message_variant_detection() {
        let request: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "m", "id": 1})).unwrap();
        let notification: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "m"})).unwrap();
        let response: JsonRpcMessage =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": 1, "id": 1})).unwrap();

        assert!(request.is_request());
        assert!(notification.is_notification());
        assert!(response.is_response());
    }

    #[test]
    fn test_response_error() {
        let resp = JsonRpcResponse::error(JsonRpcErrorData::internal_error("boom"), Id::Number(1));
        assert!(!resp.is_success());
        assert!(resp.is_error());
    }

    #[test]
    fn test_payload_wire_shape() {
        let mut payload = OperationPayload::new(
            OperationType::Subscription,
            "subscription OnStub { stub { id } }",
        );
        payload.operation_name = Some("OnStub".to_string());

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["operationType"], "subscription");
        assert_eq!(value["operationName"], "OnStub");
        assert!(value.get("variables").is_none());
    }

    #[test]
    fn test_fetch_result_tolerates_missing_fields() {
        let result: FetchResult = serde_json::from_value(json!({"data": {"stub": {"id": 1}}})).unwrap();
        assert_eq!(result.data, Some(json!({"stub": {"id": 1}})));
        assert!(!result.has_errors());

        let failed: FetchResult =
            serde_json::from_value(json!({"errors": [{"message": "denied", "path": ["stub"]}]}))
                .unwrap();
        assert!(failed.data.is_none());
        assert_eq!(failed.errors[0].message, "denied");
    }

    #[test]
    fn test_terminal_events() {
        assert!(!SubscriptionEvent::Next(FetchResult::default()).is_terminal());
        assert!(SubscriptionEvent::Complete.is_terminal());
        assert!(SubscriptionEvent::Error(Error::Timeout).is_terminal());
    }
}
