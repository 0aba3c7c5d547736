//! Client metrics
//!
//! OpenTelemetry instruments recorded by the client when observability is
//! enabled through `ClientBuilder::with_observability()`:
//!
//! - **connection_state**: gauge (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)
//! - **requests_total / request_duration**: one-shot operations
//! - **errors_total**: errors by kind
//! - **reconnection_attempts / reconnection_success**: reconnect loop
//! - **subscriptions_started / subscriptions_stopped**: subscription lifecycle
//! - **subscription_events**: server events by method

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state code
    pub connection_state: Gauge<i64>,
    /// Requests sent
    pub requests_total: Counter<u64>,
    /// Request duration in seconds
    pub request_duration: Histogram<f64>,
    /// Errors by kind
    pub errors_total: Counter<u64>,
    /// Reconnection attempts
    pub reconnection_attempts: Counter<u64>,
    /// Successful reconnections
    pub reconnection_success: Counter<u64>,
    /// Subscriptions started
    pub subscriptions_started: Counter<u64>,
    /// Subscriptions stopped by the client
    pub subscriptions_stopped: Counter<u64>,
    /// Subscription events received from the server
    pub subscription_events: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let meter = global::meter_with_scope(
            opentelemetry::InstrumentationScope::builder(service_name.into()).build(),
        );
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("sublink.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)")
                .build(),
            requests_total: meter
                .u64_counter("sublink.client.requests.total")
                .with_description("Total number of requests sent")
                .build(),
            request_duration: meter
                .f64_histogram("sublink.client.request.duration")
                .with_description("Request duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("sublink.client.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
            reconnection_attempts: meter
                .u64_counter("sublink.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("sublink.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            subscriptions_started: meter
                .u64_counter("sublink.client.subscriptions.started")
                .with_description("Total number of subscriptions started")
                .build(),
            subscriptions_stopped: meter
                .u64_counter("sublink.client.subscriptions.stopped")
                .with_description("Total number of subscriptions stopped by the client")
                .build(),
            subscription_events: meter
                .u64_counter("sublink.client.subscription.events")
                .with_description("Total number of subscription events received")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: i64) {
        self.connection_state.record(state, &[]);
    }

    /// Record a finished request
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new("error_type", error_type.to_string())]);
    }

    /// Record a reconnection attempt
    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    /// Record a successful reconnection
    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    /// Record a started subscription
    pub fn record_subscription_started(&self) {
        self.subscriptions_started.add(1, &[]);
    }

    /// Record a subscription stopped by the client
    pub fn record_subscription_stopped(&self) {
        self.subscriptions_stopped.add(1, &[]);
    }

    /// Record a subscription event
    pub fn record_subscription_event(&self, method: &str) {
        self.subscription_events
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new("test-client");

        metrics.update_connection_state(2);
        metrics.record_request("operation.execute", "success", 0.05);
        metrics.record_error("timeout");
        metrics.record_reconnection_attempt();
        metrics.record_reconnection_success();
    }

    #[test]
    fn test_subscription_metrics() {
        let metrics = ClientMetrics::new("test-client-subscriptions");

        metrics.record_subscription_started();
        metrics.record_subscription_event("subscription.data");
        metrics.record_subscription_event("subscription.complete");
        metrics.record_subscription_stopped();
    }
}
