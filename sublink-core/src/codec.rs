//! Codec for JSON-RPC frames
//!
//! Thin wrappers over serde_json that map failures onto sublink errors:
//!
//! - text that is not JSON at all → `Error::JsonRpc(parse_error)`
//! - JSON that is not a JSON-RPC 2.0 message → `Error::InvalidMessage`
//! - params that do not match the expected shape → `Error::Serialization`
//!
//! Batches are not part of the subscription protocol; an array frame is
//! rejected as an invalid message.
//!
//! # Examples
//!
//! ```rust
//! use sublink_core::{codec, Id, JsonRpcRequest};
//!
//! let request = JsonRpcRequest::new("operation.execute", None, Id::Number(1));
//! let json = codec::encode_request(&request).unwrap();
//!
//! let decoded = codec::decode(&json).unwrap();
//! assert!(decoded.is_request());
//! ```

use crate::error::{Error, JsonRpcErrorData, Result};
use crate::types::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode any serializable message to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a JSON-RPC request
pub fn encode_request(req: &JsonRpcRequest) -> Result<String> {
    encode(req)
}

/// Encode a JSON-RPC notification
pub fn encode_notification(notif: &JsonRpcNotification) -> Result<String> {
    encode(notif)
}

/// Build and encode a notification from typed params
pub fn notification<P: Serialize>(method: &str, params: &P) -> Result<String> {
    let params = serde_json::to_value(params)?;
    encode_notification(&JsonRpcNotification::new(method, Some(params)))
}

/// Decode one incoming frame
pub fn decode(data: &str) -> Result<JsonRpcMessage> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|_| Error::JsonRpc(JsonRpcErrorData::parse_error()))?;

    if value.is_array() {
        return Err(Error::InvalidMessage("batch frames are not supported".to_string()));
    }

    match value.get("jsonrpc").and_then(|v| v.as_str()) {
        Some("2.0") => {}
        Some(other) => {
            return Err(Error::InvalidMessage(format!("unsupported jsonrpc version {}", other)))
        }
        None => return Err(Error::InvalidMessage("missing jsonrpc version".to_string())),
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidMessage(e.to_string()))
}

/// Decode the params of a notification into a typed value
pub fn decode_params<T: DeserializeOwned>(notif: &JsonRpcNotification) -> Result<T> {
    let params = notif
        .params
        .clone()
        .ok_or_else(|| Error::Serialization(format!("{} carries no params", notif.method)))?;
    serde_json::from_value(params).map_err(|e| Error::Serialization(e.to_string()))
}
