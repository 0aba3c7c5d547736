//! sublink - reconnect-aware subscription streams
//!
//! This is the main convenience crate that re-exports all sublink
//! sub-crates. Use it if you want a single dependency that provides the
//! transport and the link.
//!
//! # Architecture
//!
//! sublink is organized into modular crates:
//!
//! - **sublink-core**: wire types, subscription protocol, codec, error
//!   handling, observability
//! - **sublink-client**: WebSocket transport with reconnection and reconnect
//!   listeners
//! - **sublink-link**: reconnecting sessions exposed as lazy, cancellable
//!   streams
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use sublink::{execute, ClientBuilder, Operation, WebSocketLink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tracing_subscriber::fmt::init();
//!
//!     let link = WebSocketLink::connect(
//!         ClientBuilder::new("ws://localhost:8080").with_default_reconnect(),
//!     )
//!     .await?;
//!
//!     let status = execute(&link, Operation::query("{ status }"))
//!         .next()
//!         .await;
//!     println!("Status: {:?}", status);
//!
//!     let mut ticks = execute(&link, Operation::subscription("subscription { tick }"));
//!     while let Some(tick) = ticks.next().await {
//!         println!("Tick: {:?}", tick?.data);
//!     }
//!     Ok(())
//! }
//! ```

pub use sublink_client as client;
pub use sublink_core as core;
pub use sublink_link as link;

pub use sublink_client::{ClientBuilder, SubscriptionClient};
pub use sublink_core::{Error, FetchResult, OperationPayload, OperationType, Result};
pub use sublink_link::{execute, Link, Operation, OperationStream, WebSocketLink};
