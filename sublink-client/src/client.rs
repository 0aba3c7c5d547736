//! WebSocket subscription client
//!
//! `SubscriptionClient` owns one WebSocket connection and multiplexes any
//! number of one-shot operations and subscriptions over it.
//!
//! # Client Lifecycle
//!
//! 1. **Connect**: open the socket, spawn the writer and receive tasks
//! 2. **Use**: `execute` one-shot operations, `subscribe` to streams
//! 3. **Reconnect** (optional): on connection loss, back off and reconnect,
//!    then fire the reconnect listeners
//! 4. **Close**: `close()`, or let the connection drop without a strategy
//!
//! # Reconnects and Subscriptions
//!
//! The server forgets a connection's subscriptions when it drops. The
//! client does not replay them by itself: anything that wants to survive a
//! reconnect registers with [`on_reconnected`](SubscriptionClient::on_reconnected)
//! and re-issues its own request. Old subscriptions stay registered until
//! their owner stops them, so their owner decides when the old stream ends.
//!
//! # Frame Ordering
//!
//! Every outgoing frame goes through a single queue drained by one writer
//! task. `subscribe` and `stop` are synchronous, yet a `subscription.stop`
//! can never overtake the `subscription.start` it cancels.
//!
//! # Cloning
//!
//! `SubscriptionClient` is cheaply cloneable; all clones share the same
//! connection and state.

use crate::{
    connection_state::ConnectionManager,
    listener::{ReconnectListeners, ReconnectRegistration},
    request::RequestManager,
    subscription::{self, ActiveSubscription, Dispatch, Outbound, SubscriptionRegistry, SubscriptionStopper},
    ClientMetrics, ConnectionState,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sublink_core::{
    codec, protocol, Error, FetchResult, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    OperationPayload, Result, SubscriptionEvent,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Settings resolved by the builder
pub(crate) struct ClientSettings {
    pub(crate) url: String,
    pub(crate) connection_manager: Option<Arc<ConnectionManager>>,
    pub(crate) metrics: Option<Arc<ClientMetrics>>,
    pub(crate) request_timeout: Option<Duration>,
}

/// State shared by the client handles and the background tasks
struct Shared {
    url: String,
    request_manager: RequestManager,
    subscriptions: SubscriptionRegistry,
    listeners: ReconnectListeners,
    connection_manager: Option<Arc<ConnectionManager>>,
    metrics: Option<Arc<ClientMetrics>>,
    request_timeout: Option<Duration>,
    connected: AtomicBool,
    closing: AtomicBool,
}

/// Subscription-capable client over WebSocket
#[derive(Clone)]
pub struct SubscriptionClient {
    outbound: Outbound,
    shared: Arc<Shared>,
}

impl SubscriptionClient {
    /// Connect without reconnection
    ///
    /// Use `ClientBuilder::new(url).with_reconnect(...).connect()` for a
    /// client that survives connection loss.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::establish(ClientSettings {
            url: url.to_string(),
            connection_manager: None,
            metrics: None,
            request_timeout: None,
        })
        .await
    }

    #[tracing::instrument(skip(settings), fields(url = %settings.url))]
    pub(crate) async fn establish(settings: ClientSettings) -> Result<Self> {
        tracing::info!("Connecting to server");
        if let Some(ref cm) = settings.connection_manager {
            cm.connecting().await;
        }

        let ws_stream = match connect_async(&settings.url).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                if let Some(ref cm) = settings.connection_manager {
                    cm.disconnected().await;
                }
                return Err(Error::WebSocket(e.to_string()));
            }
        };
        let (sink, source) = ws_stream.split();
        let sink = Arc::new(Mutex::new(sink));

        if let Some(ref cm) = settings.connection_manager {
            cm.connected().await;
        }
        if let Some(ref m) = settings.metrics {
            m.update_connection_state(ConnectionState::Connected.as_metric());
        }

        let shared = Arc::new(Shared {
            url: settings.url,
            request_manager: RequestManager::new(),
            subscriptions: SubscriptionRegistry::new(),
            listeners: ReconnectListeners::new(),
            connection_manager: settings.connection_manager,
            metrics: settings.metrics,
            request_timeout: settings.request_timeout,
            connected: AtomicBool::new(true),
            closing: AtomicBool::new(false),
        });

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(outbound_rx, Arc::clone(&sink)));
        tokio::spawn(receive_loop(
            source,
            sink,
            Arc::clone(&shared),
            outbound.clone(),
        ));

        tracing::info!("Connected successfully");
        Ok(Self { outbound, shared })
    }

    /// Current connection state (only tracked when reconnection is enabled)
    pub async fn connection_state(&self) -> Option<ConnectionState> {
        match self.shared.connection_manager {
            Some(ref cm) => Some(cm.state().await),
            None => None,
        }
    }

    /// Whether the socket is currently up
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.shared.subscriptions.len()
    }

    /// Queue a frame for the writer
    ///
    /// Fails while the socket is down: the receive loop has already failed
    /// every pending request by then, so a frame queued now would be lost
    /// with nobody left to report it.
    fn send(&self, text: String) -> Result<()> {
        if self.shared.closing.load(Ordering::Acquire) || !self.shared.connected.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Send a JSON-RPC request and wait for the response
    #[tracing::instrument(skip(self, params), fields(method = %method))]
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let start = Instant::now();
        let params = serde_json::to_value(params)?;

        let id = self.shared.request_manager.next_id();
        let request = JsonRpcRequest::new(method, Some(params), id.clone());
        let rx = self.shared.request_manager.register(id.clone()).await;

        // Registered before the connected check in `send`: either this request
        // is pending when the receive loop fails everything, or `send` sees
        // the socket down.
        if let Err(e) = codec::encode_request(&request).and_then(|text| self.send(text)) {
            self.shared.request_manager.forget(&id).await;
            self.record_request(method, Err(&e), start);
            return Err(e);
        }
        tracing::debug!("Request sent, waiting for response");

        let outcome = match self.shared.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.shared.request_manager.forget(&id).await;
                    self.record_request(method, Err(&Error::Timeout), start);
                    return Err(Error::Timeout);
                }
            },
            None => rx.await,
        };

        let response = outcome
            .map_err(|_| Error::Internal("Request channel closed".to_string()))
            .and_then(|received| received)
            .and_then(|response| match (response.error, response.result) {
                (Some(error), _) => Err(Error::JsonRpc(error)),
                (None, Some(result)) => Ok(result),
                (None, None) => Err(Error::Internal("Response missing result".to_string())),
            });

        self.record_request(method, response.as_ref().map(|_| ()), start);
        let result = response?;
        Ok(serde_json::from_value(result)?)
    }

    fn record_request(&self, method: &str, outcome: std::result::Result<(), &Error>, start: Instant) {
        let duration = start.elapsed().as_secs_f64();
        match outcome {
            Ok(()) => {
                tracing::debug!(method = %method, duration_secs = duration, "Request completed");
                if let Some(ref m) = self.shared.metrics {
                    m.record_request(method, "success", duration);
                }
            }
            Err(error) => {
                tracing::warn!(method = %method, error = %error, "Request failed");
                if let Some(ref m) = self.shared.metrics {
                    m.record_request(method, "error", duration);
                    m.record_error(error.kind());
                }
            }
        }
    }

    /// Run a query or mutation and wait for its single result
    pub async fn execute(&self, payload: OperationPayload) -> Result<FetchResult> {
        self.request(protocol::methods::EXECUTE, payload).await
    }

    /// Start a subscription
    ///
    /// Synchronous: the id is registered before `subscription.start` is
    /// queued, so no early event can be lost.
    pub fn subscribe(&self, payload: OperationPayload) -> Result<ActiveSubscription> {
        let (id, events) = self.shared.subscriptions.allocate();
        let frame = codec::notification(
            protocol::methods::START,
            &protocol::StartParams {
                id: id.clone(),
                payload,
            },
        );

        if let Err(e) = frame.and_then(|text| self.send(text)) {
            self.shared.subscriptions.remove(&id);
            return Err(e);
        }

        if let Some(ref m) = self.shared.metrics {
            m.record_subscription_started();
        }
        tracing::debug!(subscription_id = %id, "Subscription started");

        let stopper = SubscriptionStopper::new(
            id.clone(),
            self.shared.subscriptions.clone(),
            self.outbound.clone(),
            self.shared.metrics.clone(),
        );
        Ok(ActiveSubscription::new(id, events, stopper))
    }

    /// Register a callback to run after every successful reconnect
    pub fn on_reconnected(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> ReconnectRegistration {
        self.shared.listeners.register(callback)
    }

    /// Close the connection for good
    ///
    /// Pending requests and live subscriptions fail with `ConnectionClosed`
    /// once the socket is down; no reconnection is attempted.
    pub fn close(&self) {
        if self.shared.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Closing client");
        let _ = self.outbound.send(Message::Close(None));
    }
}

async fn write_loop(mut outbound: mpsc::UnboundedReceiver<Message>, sink: Arc<Mutex<WsSink>>) {
    while let Some(message) = outbound.recv().await {
        // Frames written while disconnected are lost with the old socket.
        if let Err(e) = sink.lock().await.send(message).await {
            tracing::debug!(error = %e, "Failed to write frame");
        }
    }
}

async fn receive_loop(
    mut source: WsSource,
    sink: Arc<Mutex<WsSink>>,
    shared: Arc<Shared>,
    outbound: Outbound,
) {
    loop {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Err(e) = shared.handle_message(&text, &outbound).await {
                        tracing::error!(error = %e, "Error handling message");
                        if let Some(ref m) = shared.metrics {
                            m.record_error(e.kind());
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Connection closed by server");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "WebSocket error");
                    if let Some(ref m) = shared.metrics {
                        m.record_error("websocket");
                    }
                    break;
                }
                _ => {}
            }
        }

        shared.connected.store(false, Ordering::Release);
        shared.request_manager.fail_all(Error::ConnectionClosed).await;

        if shared.closing.load(Ordering::Acquire) {
            tracing::info!("Client closed");
            break;
        }

        let Some(cm) = shared.connection_manager.clone() else {
            tracing::info!("No reconnection enabled, closing client");
            break;
        };

        match reconnect(&shared, &cm).await {
            Some(ws_stream) => {
                let (new_sink, new_source) = ws_stream.split();
                *sink.lock().await = new_sink;
                source = new_source;

                cm.connected().await;
                shared.connected.store(true, Ordering::Release);
                if let Some(ref m) = shared.metrics {
                    m.update_connection_state(ConnectionState::Connected.as_metric());
                    m.record_reconnection_success();
                }

                let notified = shared.listeners.notify_all();
                tracing::info!(listeners = notified, "Reconnected successfully");
            }
            None => break,
        }
    }

    let failed = shared.subscriptions.fail_all(Error::ConnectionClosed);
    if failed > 0 {
        tracing::info!(subscriptions = failed, "Failed live subscriptions");
    }
    if let Some(ref m) = shared.metrics {
        let state = match shared.connection_manager {
            Some(ref cm) => cm.state().await,
            None => ConnectionState::Disconnected,
        };
        m.update_connection_state(state.as_metric());
    }
}

async fn reconnect(shared: &Shared, cm: &ConnectionManager) -> Option<WsStream> {
    cm.disconnected().await;
    cm.start_reconnecting().await;
    if let Some(ref m) = shared.metrics {
        m.update_connection_state(ConnectionState::Reconnecting { attempt: 0 }.as_metric());
    }

    while let Some((attempt, delay)) = cm.next_reconnect_delay().await {
        tracing::info!(
            delay_secs = delay.as_secs_f64(),
            attempt = attempt,
            "Reconnecting"
        );
        if let Some(ref m) = shared.metrics {
            m.record_reconnection_attempt();
        }

        tokio::time::sleep(delay).await;
        if shared.closing.load(Ordering::Acquire) {
            return None;
        }

        match connect_async(&shared.url).await {
            Ok((ws_stream, _)) => return Some(ws_stream),
            Err(e) => {
                tracing::warn!(error = %e, attempt = attempt, "Reconnection failed");
                if let Some(ref m) = shared.metrics {
                    m.record_error("reconnection");
                }
            }
        }
    }

    tracing::error!("Reconnection abandoned (max attempts reached)");
    None
}

impl Shared {
    async fn handle_message(&self, text: &str, outbound: &Outbound) -> Result<()> {
        match codec::decode(text)? {
            JsonRpcMessage::Response(response) => {
                if !self.request_manager.complete(response).await {
                    tracing::debug!("Dropping response for unknown request");
                }
            }
            JsonRpcMessage::Notification(notification)
                if protocol::is_subscription_event(&notification.method) =>
            {
                self.dispatch_event(&notification, outbound)?;
            }
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Ignoring notification");
            }
            JsonRpcMessage::Request(_) => {
                tracing::warn!("Received unexpected request message");
            }
        }
        Ok(())
    }

    fn dispatch_event(&self, notification: &JsonRpcNotification, outbound: &Outbound) -> Result<()> {
        let (id, event) = match notification.method.as_str() {
            protocol::methods::DATA => {
                let params: protocol::DataParams = codec::decode_params(notification)?;
                (params.id, SubscriptionEvent::Next(params.result))
            }
            protocol::methods::ERROR => {
                let params: protocol::ErrorParams = codec::decode_params(notification)?;
                (params.id, SubscriptionEvent::Error(Error::JsonRpc(params.error)))
            }
            _ => {
                let params: protocol::SubscriptionIdParams = codec::decode_params(notification)?;
                (params.id, SubscriptionEvent::Complete)
            }
        };

        if let Some(ref m) = self.metrics {
            m.record_subscription_event(&notification.method);
        }

        match self.subscriptions.dispatch(&id, event) {
            Dispatch::Delivered => {}
            Dispatch::Unknown => {
                tracing::debug!(subscription_id = %id, "Dropping event for unknown subscription");
            }
            Dispatch::Orphaned => {
                tracing::debug!(subscription_id = %id, "Subscriber gone, stopping subscription");
                subscription::send_stop(outbound, &id);
            }
        }
        Ok(())
    }
}
