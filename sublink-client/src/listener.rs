//! Reconnect listeners
//!
//! Callbacks registered here run after every successful reconnect, once
//! the new socket is ready to carry frames. They run synchronously on the
//! receive loop, so they should only signal (send on a channel, flip a
//! flag) and leave the real work to their own task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Callback invoked after a reconnect
pub type ReconnectCallback = Arc<dyn Fn() + Send + Sync>;

type Listeners = Mutex<HashMap<u64, ReconnectCallback>>;

/// Set of callbacks to run after each reconnect
#[derive(Clone, Default)]
pub struct ReconnectListeners {
    listeners: Arc<Listeners>,
    next_id: Arc<AtomicU64>,
}

impl ReconnectListeners {
    /// Create an empty listener set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays registered as long as the returned
    /// registration is alive and not unregistered
    pub fn register(&self, callback: impl Fn() + Send + Sync + 'static) -> ReconnectRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));

        ReconnectRegistration {
            id,
            listeners: Arc::downgrade(&self.listeners),
            registered: AtomicBool::new(true),
        }
    }

    /// Run every registered callback; returns how many ran
    pub fn notify_all(&self) -> usize {
        // Callbacks may unregister themselves, so run them outside the lock.
        let callbacks: Vec<ReconnectCallback> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no callback is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to one registered reconnect callback
///
/// Unregisters on drop.
#[must_use = "dropping the registration unregisters the callback"]
pub struct ReconnectRegistration {
    id: u64,
    listeners: Weak<Listeners>,
    registered: AtomicBool,
}

impl ReconnectRegistration {
    /// Remove the callback; `true` only for the call that removed it
    pub fn unregister(&self) -> bool {
        if !self.registered.swap(false, Ordering::AcqRel) {
            return false;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
        true
    }

    /// Whether the callback is still registered
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }
}

impl Drop for ReconnectRegistration {
    fn drop(&mut self) {
        self.unregister();
    }
}
