//! Client builder for configuring reconnection and other options
//!
//! The `ClientBuilder` provides a fluent API for configuring client behavior
//! before connecting. It allows you to:
//! - Enable automatic reconnection with various strategies
//! - Bound how long one-shot operations wait for their response
//! - Configure observability (OpenTelemetry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use sublink_client::{ClientBuilder, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> sublink_core::Result<()> {
//! // With reconnection
//! let client = ClientBuilder::new("ws://localhost:8080")
//!     .with_reconnect(Box::new(ExponentialBackoff::default()))
//!     .with_request_timeout(Duration::from_secs(10))
//!     .connect()
//!     .await?;
//!
//! // With observability
//! let client2 = ClientBuilder::new("ws://localhost:8080")
//!     .with_default_observability()
//!     .service_name("my-client")
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{ClientSettings, SubscriptionClient};
use crate::connection_state::ConnectionManager;
use crate::reconnect::{ExponentialBackoff, ReconnectionStrategy};
use sublink_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for configuring and creating a `SubscriptionClient`
pub struct ClientBuilder {
    url: String,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    enable_reconnect: bool,
    request_timeout: Option<Duration>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_strategy: None,
            enable_reconnect: false,
            request_timeout: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Enable automatic reconnection with the given strategy
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self.enable_reconnect = true;
        self
    }

    /// Enable automatic reconnection with default exponential backoff
    pub fn with_default_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(ExponentialBackoff::default()));
        self.enable_reconnect = true;
        self
    }

    /// Disable automatic reconnection (default)
    pub fn without_reconnect(mut self) -> Self {
        self.enable_reconnect = false;
        self.reconnect_strategy = None;
        self
    }

    /// Fail one-shot operations with `Error::Timeout` after `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build and connect the client
    pub async fn connect(self) -> Result<SubscriptionClient> {
        let metrics = match self.observability_config {
            Some(mut config) => {
                if let Some(name) = self.service_name {
                    config.service_name = name;
                }

                sublink_core::init_observability(config.clone()).map_err(|e| {
                    Error::Internal(format!("Failed to initialize observability: {}", e))
                })?;

                Some(Arc::new(crate::ClientMetrics::new(config.service_name)))
            }
            None => None,
        };

        let connection_manager = if self.enable_reconnect {
            let strategy = self
                .reconnect_strategy
                .unwrap_or_else(|| Box::new(ExponentialBackoff::default()));
            Some(Arc::new(ConnectionManager::new(self.url.clone(), strategy)))
        } else {
            None
        };

        SubscriptionClient::establish(ClientSettings {
            url: self.url,
            connection_manager,
            metrics,
            request_timeout: self.request_timeout,
        })
        .await
    }
}
