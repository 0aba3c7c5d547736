//! Error types for sublink
//!
//! Two error shapes live here:
//!
//! - **Error**: the application-level error every sublink crate returns
//!   (and every observer receives)
//! - **JsonRpcErrorData**: the JSON-RPC 2.0 error object as it travels on
//!   the wire, used both for failed requests and for `subscription.error`
//!   notifications
//!
//! # Where Errors Surface
//!
//! Transport failures (socket errors, closed connections, timeouts) are
//! returned from client calls or delivered to live subscriptions. Errors
//! raised by the server for a running subscription arrive as
//! `Error::JsonRpc`. A failing reconnect recovery routine hands its own
//! error to the stream consumer unchanged.
//!
//! # Examples
//!
//! ```rust
//! use sublink_core::{Error, JsonRpcErrorData};
//!
//! let wire = JsonRpcErrorData::method_not_found("operation.execute");
//! assert_eq!(wire.code, -32601);
//!
//! let error: Error = wire.into();
//! assert!(error.to_string().contains("operation.execute"));
//! ```

use crate::types::OperationType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for sublink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for sublink operations
///
/// The enum is `Clone` because a single transport failure (a dropped
/// connection, for instance) fans out to every pending request and every
/// live subscription.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Error object sent by the remote peer
    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcErrorData),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// WebSocket transport layer error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// A frame that is valid JSON but not a JSON-RPC 2.0 message we understand
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Request operation timeout
    #[error("Request timeout")]
    Timeout,

    /// The connection is gone and will not come back
    #[error("Connection closed")]
    ConnectionClosed,

    /// An operation was routed to a path that cannot serve its type
    #[error("Unsupported operation: expected {expected}, got {actual}")]
    UnsupportedOperation {
        /// The operation type the path serves
        expected: OperationType,
        /// The operation type that was supplied
        actual: OperationType,
    },

    /// A reconnect recovery routine failed
    ///
    /// Recovery routines may return any `Error`; this variant is a
    /// convenience for routines that only have a message to report.
    #[error("Reconnect recovery failed: {0}")]
    Recovery(String),
}

impl Error {
    /// Short, stable label for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::JsonRpc(_) => "json_rpc",
            Error::Serialization(_) => "serialization",
            Error::WebSocket(_) => "websocket",
            Error::InvalidMessage(_) => "invalid_message",
            Error::Internal(_) => "internal",
            Error::Timeout => "timeout",
            Error::ConnectionClosed => "connection_closed",
            Error::UnsupportedOperation { .. } => "unsupported_operation",
            Error::Recovery(_) => "recovery",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// JSON-RPC 2.0 error object
///
/// `code` and `message` are mandatory on the wire, `data` is optional and
/// carries whatever extra context the server chose to attach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code (-32768 to -32000 are reserved by JSON-RPC)
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Optional additional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create a new JSON-RPC error with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Invalid JSON was received (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// The JSON sent is not a valid request object (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(-32600, format!("Invalid request: {}", msg.into()))
    }

    /// The method does not exist on the server (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Invalid method parameters (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, format!("Invalid params: {}", msg.into()))
    }

    /// Internal server error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, format!("Internal error: {}", msg.into()))
    }
}

impl std::fmt::Display for JsonRpcErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
