//! Subscription client over WebSocket
//!
//! This crate provides the transport side of sublink: a client that runs
//! one-shot operations and long-lived subscriptions over a single
//! WebSocket connection, and that can transparently reconnect it.
//!
//! # Core Features
//!
//! - **One-shot operations**: `execute` a query or mutation, await its result
//! - **Subscriptions**: `subscribe` and receive a stream of events
//! - **Auto-Reconnection**: configurable reconnection with exponential backoff
//! - **Reconnect listeners**: `on_reconnected` callbacks fire after every
//!   successful reconnect
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sublink_client::SubscriptionClient;
//! use sublink_core::{OperationPayload, OperationType, SubscriptionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SubscriptionClient::connect("ws://localhost:8080").await?;
//!
//!     let result = client
//!         .execute(OperationPayload::new(OperationType::Query, "{ status }"))
//!         .await?;
//!     println!("Result: {:?}", result.data);
//!
//!     let mut ticks = client.subscribe(OperationPayload::new(
//!         OperationType::Subscription,
//!         "subscription { tick }",
//!     ))?;
//!     while let Some(SubscriptionEvent::Next(result)) = ticks.next().await {
//!         println!("Tick: {:?}", result.data);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # With Reconnection
//!
//! ```rust,no_run
//! use sublink_client::{ClientBuilder, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> sublink_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:8080")
//!     .with_reconnect(Box::new(
//!         ExponentialBackoff::new(
//!             Duration::from_millis(100),
//!             Duration::from_secs(30)
//!         )
//!         .with_max_attempts(10)
//!         .with_jitter()
//!     ))
//!     .connect()
//!     .await?;
//!
//! let _registration = client.on_reconnected(|| println!("reconnected"));
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod connection_state;
mod listener;
mod metrics;
mod reconnect;
mod request;
mod subscription;

pub use client::SubscriptionClient;
pub use client_builder::ClientBuilder;
pub use connection_state::{ConnectionManager, ConnectionState};
pub use listener::{ReconnectCallback, ReconnectListeners, ReconnectRegistration};
pub use metrics::ClientMetrics;
pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy};
pub use request::RequestManager;
pub use subscription::{ActiveSubscription, Dispatch, SubscriptionRegistry, SubscriptionStopper};
