//! Subscription routing
//!
//! The server pushes `subscription.data/error/complete` notifications tagged
//! with the subscription id the client picked in `subscription.start`. The
//! registry maps those ids to per-subscription event channels.
//!
//! # Delivery Guarantees
//!
//! - Once `stop()` returns, nothing more is delivered for that subscription,
//!   even if frames for it are already in flight: the registry entry is gone
//!   and the receive loop drops them.
//! - A terminal event (`Error` or `Complete`) removes the entry before it is
//!   delivered, so a later `stop()` does not send a redundant
//!   `subscription.stop`.
//! - If the consumer drops its receiver without stopping, the next event for
//!   that id finds the channel closed; the entry is removed and the client
//!   tells the server to stop.
//!
//! The registry is behind a synchronous mutex because subscribing and
//! stopping happen from synchronous code (the link's session teardown).

use crate::ClientMetrics;
use sublink_core::{codec, protocol, Error, SubscriptionEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub(crate) type Outbound = mpsc::UnboundedSender<Message>;
type EventSender = mpsc::UnboundedSender<SubscriptionEvent>;

/// Result of routing one server event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the subscriber
    Delivered,
    /// No live subscription with this id
    Unknown,
    /// The subscriber went away; the entry was removed
    Orphaned,
}

/// Maps subscription ids to their event channels
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    entries: Arc<Mutex<HashMap<String, EventSender>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, EventSender>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh id and register a channel for it
    pub fn allocate(&self) -> (String, mpsc::UnboundedReceiver<SubscriptionEvent>) {
        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.entries().insert(id.clone(), tx);
        (id, rx)
    }

    /// Remove an entry; `true` if it was still registered
    pub fn remove(&self, id: &str) -> bool {
        self.entries().remove(id).is_some()
    }

    /// Whether the id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Route one event to its subscriber
    pub fn dispatch(&self, id: &str, event: SubscriptionEvent) -> Dispatch {
        let mut entries = self.entries();
        let sender = if event.is_terminal() {
            entries.remove(id)
        } else {
            entries.get(id).cloned()
        };

        let Some(sender) = sender else {
            return Dispatch::Unknown;
        };

        if sender.send(event).is_ok() {
            Dispatch::Delivered
        } else {
            entries.remove(id);
            Dispatch::Orphaned
        }
    }

    /// Fail every live subscription and clear the registry
    pub fn fail_all(&self, error: Error) -> usize {
        let drained: Vec<EventSender> = self.entries().drain().map(|(_, tx)| tx).collect();
        for tx in &drained {
            let _ = tx.send(SubscriptionEvent::Error(error.clone()));
        }
        drained.len()
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether there are no live subscriptions
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Stops one subscription; cheap to clone, idempotent
#[derive(Clone)]
pub struct SubscriptionStopper {
    id: String,
    registry: SubscriptionRegistry,
    outbound: Outbound,
    metrics: Option<Arc<ClientMetrics>>,
}

impl SubscriptionStopper {
    pub(crate) fn new(
        id: String,
        registry: SubscriptionRegistry,
        outbound: Outbound,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            id,
            registry,
            outbound,
            metrics,
        }
    }

    /// Stop delivery and tell the server, once
    ///
    /// Returns `true` only for the call that actually stopped the
    /// subscription.
    pub fn stop(&self) -> bool {
        if !self.registry.remove(&self.id) {
            return false;
        }

        send_stop(&self.outbound, &self.id);
        if let Some(ref m) = self.metrics {
            m.record_subscription_stopped();
        }
        tracing::debug!(subscription_id = %self.id, "Subscription stopped");
        true
    }
}

pub(crate) fn send_stop(outbound: &Outbound, id: &str) {
    let params = protocol::SubscriptionIdParams { id: id.to_string() };
    match codec::notification(protocol::methods::STOP, &params) {
        Ok(text) => {
            // A closed queue means the connection is gone, and so is the
            // server-side subscription.
            let _ = outbound.send(Message::Text(text));
        }
        Err(e) => tracing::warn!(error = %e, "Failed to encode subscription.stop"),
    }
}

/// A live subscription on the client
///
/// Events arrive through [`next`](Self::next). Call [`stop`](Self::stop)
/// to end it early; dropping the handle only stops it lazily, when the next
/// event for it arrives.
pub struct ActiveSubscription {
    id: String,
    events: mpsc::UnboundedReceiver<SubscriptionEvent>,
    stopper: SubscriptionStopper,
}

impl ActiveSubscription {
    pub(crate) fn new(
        id: String,
        events: mpsc::UnboundedReceiver<SubscriptionEvent>,
        stopper: SubscriptionStopper,
    ) -> Self {
        Self {
            id,
            events,
            stopper,
        }
    }

    /// The id used on the wire
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next event; `None` once the channel is closed
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Stop the subscription (idempotent)
    pub fn stop(&self) -> bool {
        self.stopper.stop()
    }

    /// Split into the event receiver and a detached stopper
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<SubscriptionEvent>,
        SubscriptionStopper,
    ) {
        (self.events, self.stopper)
    }
}
