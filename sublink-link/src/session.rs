//! Reconnecting session
//!
//! A session owns one logical subscription against a transport and keeps it
//! alive across reconnects.
//!
//! ```text
//!            open
//!             │
//!             ▼
//!          Active ◄────────────── resubscribed
//!             │                        ▲
//!   reconnect │                        │ recovery settled,
//!    signal   ▼                        │ not cancelled
//!     ReconnectPending ────────────────┘
//!             │
//!             ▼
//!         Cancelled   (cancel, error, completion, failed recovery)
//! ```
//!
//! # Reconnect Cycle
//!
//! 1. Tear down the current transport subscription
//! 2. Await the operation's recovery routine, if any (cancel does not
//!    interrupt it)
//! 3. Re-check the state: a cancel that landed during step 2 wins
//! 4. Issue the request again
//!
//! Steps 3 and 4 happen under the session lock, so `cancel()` either sees
//! the new subscription and tears it down, or the cycle sees `Cancelled`
//! and stops.
//!
//! # Delivery
//!
//! Events go to the [`Observer`] from the session task only. Each delivery
//! checks the state and calls the observer under a delivery lock that
//! `cancel()` also takes, so once `cancel()` returns the observer hears
//! nothing more. Otherwise it hears about exactly one terminal event (error
//! or completion).

use crate::operation::Operation;
use crate::transport::{EventReceiver, Teardown, Transport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sublink_core::{Error, FetchResult, OperationType, Result, SubscriptionEvent};
use tokio::sync::{mpsc, Notify};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Consumer of a session's results
///
/// Callbacks run under the session's delivery lock: cancelling the same
/// session from inside a callback deadlocks. Hand results off instead.
pub trait Observer: Send + 'static {
    fn next(&mut self, result: FetchResult);
    fn error(&mut self, error: Error);
    fn complete(&mut self);
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// A transport subscription is live
    Active,
    /// A reconnect cycle is tearing down and re-issuing the subscription
    ReconnectPending,
    /// Terminal; nothing is live and nothing will be created
    Cancelled,
}

struct Shared {
    state: SessionState,
    current: Option<Teardown>,
    registration: Option<Teardown>,
}

/// Teardowns taken out of a session that just moved to `Cancelled`
struct Released {
    current: Option<Teardown>,
    registration: Option<Teardown>,
}

impl Released {
    fn run(self) {
        if let Some(registration) = self.registration {
            registration.run();
        }
        if let Some(current) = self.current {
            current.run();
        }
    }
}

/// Handle to a running session
///
/// Cheap to clone; every clone cancels the same session.
#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    shared: Arc<Mutex<Shared>>,
    delivery: Arc<Mutex<()>>,
    wake: Arc<Notify>,
}

impl SessionHandle {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Held across every observer callback; taken before the state lock
    fn delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == SessionState::Cancelled
    }

    /// Cancel the session
    ///
    /// Releases the current transport subscription and the reconnect
    /// registration right away. A recovery routine already running keeps
    /// running, but no subscription is issued after it. Idempotent: returns
    /// `true` only for the call that cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shutdown();
        if cancelled {
            tracing::debug!(session_id = self.id, "Session cancelled");
            self.wake.notify_one();
        }
        cancelled
    }

    /// Move to `Cancelled` and release everything; `true` for the call that
    /// made the transition
    fn shutdown(&self) -> bool {
        let released = {
            let _delivery = self.delivery();
            self.mark_cancelled()
        };
        match released {
            Some(released) => {
                released.run();
                true
            }
            None => false,
        }
    }

    /// Caller holds the delivery lock
    fn mark_cancelled(&self) -> Option<Released> {
        let mut shared = self.lock();
        if shared.state == SessionState::Cancelled {
            return None;
        }
        shared.state = SessionState::Cancelled;
        Some(Released {
            current: shared.current.take(),
            registration: shared.registration.take(),
        })
    }
}

/// Entry point for reconnecting sessions
pub struct ReconnectingSession<O> {
    handle: SessionHandle,
    operation: Operation,
    transport: Arc<dyn Transport>,
    observer: O,
}

impl<O: Observer> ReconnectingSession<O> {
    /// Start a session for a subscription operation
    ///
    /// Registers for reconnect signals, issues the first request and spawns
    /// the task that forwards events to `observer`. Must run inside a tokio
    /// runtime.
    pub fn open(
        operation: Operation,
        transport: Arc<dyn Transport>,
        observer: O,
    ) -> Result<SessionHandle> {
        if !operation.is_subscription() {
            return Err(Error::UnsupportedOperation {
                expected: OperationType::Subscription,
                actual: operation.operation_type(),
            });
        }

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let registration = transport.on_reconnected(Arc::new(move || {
            let _ = signal_tx.send(());
        }));
        let (events, current) = transport.request(&operation).into_parts();

        let handle = SessionHandle {
            id,
            shared: Arc::new(Mutex::new(Shared {
                state: SessionState::Active,
                current: Some(current),
                registration: Some(registration),
            })),
            delivery: Arc::new(Mutex::new(())),
            wake: Arc::new(Notify::new()),
        };
        tracing::debug!(session_id = id, "Session opened");

        let session = Self {
            handle: handle.clone(),
            operation,
            transport,
            observer,
        };
        tokio::spawn(session.run(events, signals));

        Ok(handle)
    }

    async fn run(mut self, mut events: EventReceiver, mut signals: mpsc::UnboundedReceiver<()>) {
        let wake = Arc::clone(&self.handle.wake);
        let mut signals_open = true;

        loop {
            tokio::select! {
                biased;

                _ = wake.notified() => {
                    if self.handle.is_cancelled() {
                        break;
                    }
                }
                event = events.recv() => {
                    if self.handle.is_cancelled() {
                        break;
                    }
                    match event {
                        Some(SubscriptionEvent::Next(result)) => {
                            if !self.deliver(result) {
                                break;
                            }
                        }
                        Some(SubscriptionEvent::Error(error)) => {
                            tracing::debug!(session_id = self.handle.id, error = %error, "Session failed");
                            self.finish(Some(error));
                            break;
                        }
                        Some(SubscriptionEvent::Complete) | None => {
                            tracing::debug!(session_id = self.handle.id, "Session completed");
                            self.finish(None);
                            break;
                        }
                    }
                }
                signal = signals.recv(), if signals_open => match signal {
                    Some(()) => match self.on_reconnect_signal().await {
                        Some(next) => events = next,
                        None => break,
                    },
                    None => signals_open = false,
                },
            }
        }
    }

    /// Forward a value unless the session was cancelled; `false` when it was
    fn deliver(&mut self, result: FetchResult) -> bool {
        let _delivery = self.handle.delivery();
        if self.handle.is_cancelled() {
            return false;
        }
        self.observer.next(result);
        true
    }

    /// End the session with a terminal event, unless a cancel got there first
    fn finish(&mut self, error: Option<Error>) {
        let released = {
            let _delivery = self.handle.delivery();
            let released = self.handle.mark_cancelled();
            if released.is_some() {
                match error {
                    Some(error) => self.observer.error(error),
                    None => self.observer.complete(),
                }
            }
            released
        };
        if let Some(released) = released {
            released.run();
        }
    }

    /// One reconnect cycle; returns the new event receiver, or `None` when
    /// the session is over
    async fn on_reconnect_signal(&mut self) -> Option<EventReceiver> {
        let stale = {
            let mut shared = self.handle.lock();
            if shared.state == SessionState::Cancelled {
                return None;
            }
            shared.state = SessionState::ReconnectPending;
            shared.current.take()
        };
        if let Some(stale) = stale {
            stale.run();
        }
        tracing::debug!(session_id = self.handle.id, "Reconnect signal, stale subscription released");

        if let Some(routine) = self.operation.context().on_reconnect.clone() {
            if let Err(error) = routine().await {
                tracing::warn!(session_id = self.handle.id, error = %error, "Recovery routine failed");
                self.finish(Some(error));
                return None;
            }
        }

        let mut shared = self.handle.lock();
        if shared.state == SessionState::Cancelled {
            tracing::debug!(session_id = self.handle.id, "Cancelled during recovery, not resubscribing");
            return None;
        }
        let (events, current) = self.transport.request(&self.operation).into_parts();
        shared.current = Some(current);
        shared.state = SessionState::Active;
        tracing::debug!(session_id = self.handle.id, "Resubscribed");
        Some(events)
    }
}
