//! Reconnecting subscription link
//!
//! This crate exposes operations as lazy, cancellable streams. Queries and
//! mutations become one-item streams. Subscriptions are backed by a
//! [`ReconnectingSession`] that survives transport reconnects: on every
//! reconnect it releases the stale subscription, awaits the operation's
//! recovery routine and subscribes again, unless the stream was cancelled in
//! the meantime.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use sublink_client::ClientBuilder;
//! use sublink_link::{execute, Operation, WebSocketLink};
//!
//! # async fn example() -> sublink_core::Result<()> {
//! let link = WebSocketLink::connect(
//!     ClientBuilder::new("ws://localhost:8080").with_default_reconnect(),
//! )
//! .await?;
//!
//! let operation = Operation::subscription("subscription { tick }")
//!     .with_on_reconnect(|| async {
//!         // refresh credentials, reload state...
//!         Ok(())
//!     });
//!
//! let mut ticks = execute(&link, operation);
//! while let Some(result) = ticks.next().await {
//!     println!("{:?}", result?.data);
//! }
//! # Ok(())
//! # }
//! ```

mod link;
mod operation;
mod session;
mod stream;
mod transport;

pub use link::{execute, Link, WebSocketLink};
pub use operation::{Operation, OperationContext, RecoveryRoutine};
pub use session::{Observer, ReconnectingSession, SessionHandle, SessionState};
pub use stream::OperationStream;
pub use transport::{EventReceiver, ReconnectCallback, Teardown, Transport, TransportSubscription};
