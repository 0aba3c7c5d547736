//! Connection state tracking
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                     ↓           ↓  ↑
//!                  Failed ← Reconnecting { attempt }
//! ```
//!
//! The manager pairs the current state with the reconnection strategy, so
//! the receive loop can ask "how long until the next attempt, if any?"
//! without juggling attempt counters itself. A successful connection
//! resets the strategy for the next outage.

use crate::reconnect::ReconnectionStrategy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting the initial connection
    Connecting,
    /// Connected and operational
    Connected,
    /// Connection lost; `attempt` reconnects have been scheduled so far
    Reconnecting { attempt: u32 },
    /// The strategy gave up
    Failed,
}

impl ConnectionState {
    /// Numeric code used by the connection state gauge
    pub fn as_metric(&self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Failed => 4,
        }
    }
}

/// Couples the connection state with the reconnection strategy
pub struct ConnectionManager {
    state: Arc<RwLock<ConnectionState>>,
    strategy: Arc<RwLock<Box<dyn ReconnectionStrategy>>>,
    url: String,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new(url: impl Into<String>, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            strategy: Arc::new(RwLock::new(strategy)),
            url: url.into(),
        }
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    /// The URL (re)connections go to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Transition to connecting state
    pub async fn connecting(&self) {
        self.set_state(ConnectionState::Connecting).await;
    }

    /// Transition to connected state and reset the strategy
    pub async fn connected(&self) {
        self.set_state(ConnectionState::Connected).await;
        self.strategy.write().await.reset();
    }

    /// Transition to disconnected state
    pub async fn disconnected(&self) {
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// Enter the reconnecting state with a fresh attempt counter
    pub async fn start_reconnecting(&self) {
        self.set_state(ConnectionState::Reconnecting { attempt: 0 })
            .await;
    }

    /// Schedule the next reconnection attempt
    ///
    /// Returns the 1-based attempt number and the delay to wait before it,
    /// or `None` once the strategy gives up (the state is then `Failed`).
    pub async fn next_reconnect_delay(&self) -> Option<(u32, Duration)> {
        let attempt = match self.state().await {
            ConnectionState::Reconnecting { attempt } => attempt,
            _ => 0,
        };

        match self.strategy.write().await.next_delay(attempt) {
            Some(delay) => {
                self.set_state(ConnectionState::Reconnecting {
                    attempt: attempt + 1,
                })
                .await;
                Some((attempt + 1, delay))
            }
            None => {
                self.set_state(ConnectionState::Failed).await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::{ExponentialBackoff, NoReconnect};

    fn manager(max_attempts: u32) -> ConnectionManager {
        let strategy = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10))
            .with_max_attempts(max_attempts);
        ConnectionManager::new("ws://localhost:8080", Box::new(strategy))
    }

    #[tokio::test]
    async fn test_connection_state_transitions() {
        let manager = manager(3);
        assert_eq!(manager.state().await, ConnectionState::Disconnected);

        manager.connecting().await;
        assert_eq!(manager.state().await, ConnectionState::Connecting);

        manager.connected().await;
        assert_eq!(manager.state().await, ConnectionState::Connected);

        manager.disconnected().await;
        assert_eq!(manager.state().await, ConnectionState::Disconnected);
        assert_eq!(manager.url(), "ws://localhost:8080");
    }

    #[tokio::test]
    async fn test_attempts_count_up_then_fail() {
        let manager = manager(2);
        manager.start_reconnecting().await;

        let (first, delay) = manager.next_reconnect_delay().await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(delay, Duration::from_millis(100));
        assert_eq!(
            manager.state().await,
            ConnectionState::Reconnecting { attempt: 1 }
        );

        let (second, delay) = manager.next_reconnect_delay().await.unwrap();
        assert_eq!(second, 2);
        assert_eq!(delay, Duration::from_millis(200));

        assert!(manager.next_reconnect_delay().await.is_none());
        assert_eq!(manager.state().await, ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_reconnect_cycle_starts_over_after_connect() {
        let manager = manager(5);
        manager.start_reconnecting().await;
        manager.next_reconnect_delay().await;
        manager.next_reconnect_delay().await;

        manager.connected().await;
        manager.start_reconnecting().await;

        let (attempt, delay) = manager.next_reconnect_delay().await.unwrap();
        assert_eq!(attempt, 1);
        assert_eq!(delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_no_reconnect_fails_immediately() {
        let manager = ConnectionManager::new("ws://localhost:8080", Box::new(NoReconnect));
        manager.start_reconnecting().await;

        assert!(manager.next_reconnect_delay().await.is_none());
        assert_eq!(manager.state().await, ConnectionState::Failed);
    }

    #[test]
    fn test_metric_codes() {
        assert_eq!(ConnectionState::Disconnected.as_metric(), 0);
        assert_eq!(ConnectionState::Connected.as_metric(), 2);
        assert_eq!(ConnectionState::Reconnecting { attempt: 7 }.as_metric(), 3);
        assert_eq!(ConnectionState::Failed.as_metric(), 4);
    }
}
