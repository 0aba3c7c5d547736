//! Wire types, subscription protocol and codec for sublink
//!
//! This crate holds everything the transport (`sublink-client`) and the
//! link (`sublink-link`) have to agree on:
//!
//! - **Types**: JSON-RPC 2.0 envelopes plus the operation model
//!   (`OperationPayload`, `FetchResult`, `SubscriptionEvent`)
//! - **Protocol**: method names and params of the subscription conversation
//! - **Codec**: frame encoding and decoding
//! - **Error handling**: the shared `Error` type
//! - **Observability**: tracing and OpenTelemetry bootstrap
//!
//! # Example
//!
//! ```rust
//! use sublink_core::{codec, protocol, OperationPayload, OperationType};
//!
//! let payload = OperationPayload::new(OperationType::Subscription, "subscription { tick }");
//! let frame = codec::notification(
//!     protocol::methods::START,
//!     &protocol::StartParams { id: "1".into(), payload },
//! )
//! .unwrap();
//! assert!(frame.contains("subscription.start"));
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod types;

pub use error::{Error, JsonRpcErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{
    FetchError, FetchResult, Id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OperationPayload, OperationType, SubscriptionEvent,
};
