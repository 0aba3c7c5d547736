//! Reconnection strategies
//!
//! When the socket drops, the client asks its strategy how long to wait
//! before the next attempt, until the strategy returns `None`.
//!
//! - **ExponentialBackoff**: doubling delays between a floor and a ceiling (recommended)
//! - **FixedDelay**: the same delay every time
//! - **NoReconnect**: give up immediately
//!
//! Every successful reconnect is followed by the client's reconnect
//! listeners firing, which is what lets live subscription sessions
//! re-issue their requests.
//!
//! ```rust
//! use sublink_client::ExponentialBackoff;
//! use std::time::Duration;
//!
//! // 100ms to 30s, 10 attempts, jittered
//! let default = ExponentialBackoff::default();
//!
//! // 1s to 60s, never give up
//! let patient = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
//! ```

use rand::Rng;
use std::time::Duration;

/// Decides whether and when to attempt the next reconnection
///
/// Strategies are stateful; `reset()` is called after every successful
/// connection so the next outage starts from scratch.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before attempt number `attempt` (0-indexed), or `None` to give up
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Forget accumulated state after a successful connection
    fn reset(&mut self);
}

/// Exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Backoff doubling from `min_delay` up to `max_delay`, unlimited attempts
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
            current_attempt: 0,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random jitter to every delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.min_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
            .with_max_attempts(10)
            .with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        self.current_attempt = attempt;

        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }

        let delay = self.base_delay(attempt);
        if !self.jitter {
            return Some(delay);
        }

        let quarter = delay.as_millis() as u64 / 4;
        let jitter = rand::thread_rng().gen_range(0..=quarter);
        Some(delay + Duration::from_millis(jitter))
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Constant delay between attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Retry every `delay`, unlimited attempts
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }

    fn reset(&mut self) {}
}

/// Never reconnect
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&mut self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}
