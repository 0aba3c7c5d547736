//! Transport seam
//!
//! The session only needs three things from whatever carries its requests:
//! issue a subscription, run a one-shot operation, and report reconnects.
//! [`SubscriptionClient`] is the production transport; tests script their
//! own.

use crate::operation::Operation;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Mutex, PoisonError};
use sublink_client::SubscriptionClient;
use sublink_core::{Error, FetchResult, Result, SubscriptionEvent};
use tokio::sync::mpsc;

pub use sublink_client::ReconnectCallback;

/// Receiving side of one transport subscription
pub type EventReceiver = mpsc::UnboundedReceiver<SubscriptionEvent>;

/// Something that carries operations and reports reconnects
pub trait Transport: Send + Sync + 'static {
    /// Issue a subscription
    ///
    /// Once the returned teardown has run, no further event may be
    /// delivered on its receiver.
    fn request(&self, operation: &Operation) -> TransportSubscription;

    /// Run a query or mutation
    fn execute(&self, operation: &Operation) -> BoxFuture<'static, Result<FetchResult>>;

    /// Call `callback` after every reconnect until the teardown runs
    fn on_reconnected(&self, callback: ReconnectCallback) -> Teardown;
}

/// Idempotent release action; runs at most once, on drop at the latest
pub struct Teardown {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Teardown {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// A teardown with nothing to release
    pub fn noop() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// Run the action; `true` only for the call that ran it
    pub fn run(&self) -> bool {
        let action = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Whether the action already ran (or there never was one)
    pub fn is_done(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run();
    }
}

/// One live request against a transport
pub struct TransportSubscription {
    events: EventReceiver,
    teardown: Teardown,
}

impl TransportSubscription {
    pub fn new(events: EventReceiver, teardown: Teardown) -> Self {
        Self { events, teardown }
    }

    /// A subscription that only reports `error`
    pub fn failed(error: Error) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let _ = tx.send(SubscriptionEvent::Error(error));
        Self::new(events, Teardown::noop())
    }

    pub fn into_parts(self) -> (EventReceiver, Teardown) {
        (self.events, self.teardown)
    }
}

impl Transport for SubscriptionClient {
    fn request(&self, operation: &Operation) -> TransportSubscription {
        match self.subscribe(operation.payload().clone()) {
            Ok(subscription) => {
                let (events, stopper) = subscription.into_parts();
                TransportSubscription::new(
                    events,
                    Teardown::new(move || {
                        stopper.stop();
                    }),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start subscription");
                TransportSubscription::failed(e)
            }
        }
    }

    fn execute(&self, operation: &Operation) -> BoxFuture<'static, Result<FetchResult>> {
        let client = self.clone();
        let payload = operation.payload().clone();
        async move { SubscriptionClient::execute(&client, payload).await }.boxed()
    }

    fn on_reconnected(&self, callback: ReconnectCallback) -> Teardown {
        let registration = SubscriptionClient::on_reconnected(self, move || callback());
        Teardown::new(move || {
            registration.unregister();
        })
    }
}
