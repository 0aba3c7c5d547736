//! Common test utilities for sublink-link integration tests

#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sublink_core::{Error, FetchResult, Result, SubscriptionEvent};
use sublink_link::{Observer, Operation, ReconnectCallback, Teardown, Transport, TransportSubscription};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// In-memory transport driven by the test
#[derive(Default)]
pub struct MockTransport {
    subscriptions: Arc<Mutex<Vec<Option<mpsc::UnboundedSender<SubscriptionEvent>>>>>,
    listeners: Arc<Mutex<Vec<(usize, ReconnectCallback)>>>,
    unsubscribes: Arc<AtomicUsize>,
    unregisters: Arc<AtomicUsize>,
    next_listener: AtomicUsize,
    execute_result: Mutex<Option<Result<FetchResult>>>,
    executes: AtomicUsize,
    keep_torn_down: bool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_execute_result(result: Result<FetchResult>) -> Arc<Self> {
        let transport = Self::default();
        *transport.execute_result.lock().unwrap() = Some(result);
        Arc::new(transport)
    }

    /// Transport whose teardown leaves the event sender open, so events can
    /// still land on a receiver the session has moved away from
    pub fn keeping_torn_down_senders() -> Arc<Self> {
        Arc::new(Self {
            keep_torn_down: true,
            ..Self::default()
        })
    }

    /// Times `request` was called
    pub fn request_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Times a subscription teardown ran
    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    /// Times a reconnect registration was removed
    pub fn unregister_count(&self) -> usize {
        self.unregisters.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn execute_count(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    /// Deliver an event on the `index`-th subscription; `false` if it was
    /// torn down
    pub fn emit(&self, index: usize, event: SubscriptionEvent) -> bool {
        match self.subscriptions.lock().unwrap().get(index) {
            Some(Some(tx)) => tx.send(event).is_ok(),
            _ => false,
        }
    }

    pub fn emit_data(&self, index: usize, data: Value) -> bool {
        self.emit(index, SubscriptionEvent::Next(FetchResult::from_data(data)))
    }

    /// Drop the sender of the `index`-th subscription without a terminal event
    pub fn close(&self, index: usize) {
        if let Some(slot) = self.subscriptions.lock().unwrap().get_mut(index) {
            slot.take();
        }
    }

    /// Fire every reconnect listener
    pub fn reconnect(&self) {
        let listeners: Vec<ReconnectCallback> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in listeners {
            callback();
        }
    }
}

impl Transport for MockTransport {
    fn request(&self, _operation: &Operation) -> TransportSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let index = {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            subscriptions.push(Some(tx));
            subscriptions.len() - 1
        };

        let subscriptions = Arc::clone(&self.subscriptions);
        let unsubscribes = Arc::clone(&self.unsubscribes);
        let keep_torn_down = self.keep_torn_down;
        TransportSubscription::new(
            rx,
            Teardown::new(move || {
                if !keep_torn_down {
                    subscriptions.lock().unwrap()[index] = None;
                }
                unsubscribes.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    fn execute(&self, _operation: &Operation) -> BoxFuture<'static, Result<FetchResult>> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        let result = self
            .execute_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(Error::Internal("no execute result scripted".into())));
        async move { result }.boxed()
    }

    fn on_reconnected(&self, callback: ReconnectCallback) -> Teardown {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, callback));

        let listeners = Arc::clone(&self.listeners);
        let unregisters = Arc::clone(&self.unregisters);
        Teardown::new(move || {
            listeners.lock().unwrap().retain(|(other, _)| *other != id);
            unregisters.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// What an observer saw
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Next(Value),
    Error(String),
    Complete,
}

/// Observer forwarding everything it sees to a channel
pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<Observed>,
}

impl RecordingObserver {
    pub fn new() -> (Self, Observations) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Observations { rx })
    }
}

impl Observer for RecordingObserver {
    fn next(&mut self, result: FetchResult) {
        let _ = self.tx.send(Observed::Next(result.data.unwrap_or_default()));
    }

    fn error(&mut self, error: Error) {
        let _ = self.tx.send(Observed::Error(error.to_string()));
    }

    fn complete(&mut self) {
        let _ = self.tx.send(Observed::Complete);
    }
}

pub struct Observations {
    rx: mpsc::UnboundedReceiver<Observed>,
}

impl Observations {
    /// Next observation, failing the test after a few seconds
    pub async fn next(&mut self) -> Observed {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for an observation")
            .expect("observer dropped")
    }

    /// `true` when nothing is observed within `window`
    pub async fn quiet_for(&mut self, window: Duration) -> bool {
        match tokio::time::timeout(window, self.rx.recv()).await {
            Err(_) => true,
            Ok(None) => true,
            Ok(Some(_)) => false,
        }
    }

    /// Whether the observer was dropped (the session task is over)
    pub async fn closed(&mut self) -> bool {
        matches!(
            tokio::time::timeout(Duration::from_secs(5), self.rx.recv()).await,
            Ok(None)
        )
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..250 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

/// WebSocket server answering `subscription.start` with one data frame
/// carrying `{"start": n}`, n counting starts
pub struct TickServer {
    pub url: String,
    pub frames: mpsc::UnboundedReceiver<Value>,
    current: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>,
}

impl TickServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (frames_tx, frames) = mpsc::unbounded_channel();
        let current: Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>> = Arc::new(Mutex::new(None));
        let starts = Arc::new(AtomicUsize::new(0));

        let accept_current = Arc::clone(&current);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws_stream) = accept_async(stream).await else { continue };
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
                *accept_current.lock().unwrap() = Some(out_tx.clone());

                let frames_tx = frames_tx.clone();
                let starts = Arc::clone(&starts);
                tokio::spawn(async move {
                    let (mut write, mut read) = ws_stream.split();
                    loop {
                        tokio::select! {
                            incoming = read.next() => match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
                                    if frame["method"] == "subscription.start" {
                                        let n = starts.fetch_add(1, Ordering::SeqCst) + 1;
                                        let reply = json!({
                                            "jsonrpc": "2.0",
                                            "method": "subscription.data",
                                            "params": {
                                                "id": frame["params"]["id"],
                                                "result": { "data": { "start": n } }
                                            }
                                        });
                                        let _ = out_tx.send(Message::Text(reply.to_string()));
                                    }
                                    let _ = frames_tx.send(frame);
                                }
                                Some(Ok(_)) => {}
                                _ => break,
                            },
                            outgoing = out_rx.recv() => match outgoing {
                                Some(Message::Close(frame)) => {
                                    let _ = write.send(Message::Close(frame)).await;
                                    break;
                                }
                                Some(message) => {
                                    let _ = write.send(message).await;
                                }
                                None => break,
                            },
                        }
                    }
                });
            }
        });

        Self {
            url,
            frames,
            current,
        }
    }

    /// Close the live connection, keep accepting
    pub fn drop_connection(&self) {
        if let Some(conn) = self.current.lock().unwrap().take() {
            let _ = conn.send(Message::Close(None));
        }
    }

    pub async fn next_frame_with_method(&mut self, method: &str) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.frames.recv())
                .await
                .expect("timed out waiting for a frame")
                .expect("server stopped");
            if frame["method"] == method {
                return frame;
            }
        }
    }
}
