//! Common test utilities for sublink-client integration tests
//!
//! `MockWsServer` speaks just enough of the subscription protocol to drive
//! the client: a handler answers each incoming frame, tests can push frames
//! at will and drop the live connection to trigger a reconnect.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

type Handler = Arc<dyn Fn(&Value) -> Vec<String> + Send + Sync>;
type Connection = mpsc::UnboundedSender<Message>;

/// Mock WebSocket server for client testing
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    received: mpsc::UnboundedReceiver<Value>,
    current: Arc<Mutex<Option<Connection>>>,
    connections: Arc<Mutex<usize>>,
}

impl MockWsServer {
    /// Server that never answers
    pub async fn silent() -> Self {
        Self::with_handler(|_| Vec::new()).await
    }

    /// Server answering every frame through `handler`
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (received_tx, received) = mpsc::unbounded_channel();
        let current: Arc<Mutex<Option<Connection>>> = Arc::new(Mutex::new(None));
        let connections = Arc::new(Mutex::new(0));

        let accept_current = Arc::clone(&current);
        let accept_connections = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let Ok(ws_stream) = accept_async(stream).await else { continue };

                        let (out_tx, out_rx) = mpsc::unbounded_channel();
                        *accept_current.lock().unwrap() = Some(out_tx.clone());
                        *accept_connections.lock().unwrap() += 1;

                        tokio::spawn(serve(
                            ws_stream,
                            out_tx,
                            out_rx,
                            Arc::clone(&handler),
                            received_tx.clone(),
                        ));
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            received,
            current,
            connections,
        }
    }

    /// WebSocket URL of this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of connections accepted so far
    pub fn connection_count(&self) -> usize {
        *self.connections.lock().unwrap()
    }

    /// Push a frame to the most recent connection
    pub fn push(&self, frame: String) {
        if let Some(conn) = self.current.lock().unwrap().as_ref() {
            let _ = conn.send(Message::Text(frame));
        }
    }

    /// Close the most recent connection, keep accepting new ones
    pub fn drop_connection(&self) {
        if let Some(conn) = self.current.lock().unwrap().take() {
            let _ = conn.send(Message::Close(None));
        }
    }

    /// Wait for the next frame the server received
    pub async fn next_frame(&mut self) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(5), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next frame with the given method, skipping others
    pub async fn next_frame_with_method(&mut self, method: &str) -> Option<Value> {
        while let Some(frame) = self.next_frame().await {
            if frame["method"] == method {
                return Some(frame);
            }
        }
        None
    }

    /// Stop accepting and close the current connection
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.drop_connection();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn serve(
    ws_stream: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    out_tx: Connection,
    mut out_rx: mpsc::UnboundedReceiver<Message>,
    handler: Handler,
    received: mpsc::UnboundedSender<Value>,
) {
    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
                    for reply in handler(&frame) {
                        let _ = out_tx.send(Message::Text(reply));
                    }
                    let _ = received.send(frame);
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            outgoing = out_rx.recv() => match outgoing {
                Some(Message::Close(frame)) => {
                    let _ = write.send(Message::Close(frame)).await;
                    break;
                }
                Some(message) => {
                    if write.send(message).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// JSON-RPC success response
pub fn mock_response(id: &Value, result: Value) -> String {
    json!({ "jsonrpc": "2.0", "result": result, "id": id }).to_string()
}

/// JSON-RPC error response
pub fn mock_error_response(id: &Value, code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message },
        "id": id
    })
    .to_string()
}

/// `subscription.data` notification
pub fn data_frame(subscription_id: &str, data: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "subscription.data",
        "params": { "id": subscription_id, "result": { "data": data } }
    })
    .to_string()
}

/// `subscription.complete` notification
pub fn complete_frame(subscription_id: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "subscription.complete",
        "params": { "id": subscription_id }
    })
    .to_string()
}

/// `subscription.error` notification
pub fn error_frame(subscription_id: &str, code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "subscription.error",
        "params": { "id": subscription_id, "error": { "code": code, "message": message } }
    })
    .to_string()
}

/// Handler answering `operation.execute` with `{"data": data}`
pub fn execute_handler(data: Value) -> impl Fn(&Value) -> Vec<String> + Send + Sync + 'static {
    move |frame| {
        if frame["method"] == "operation.execute" {
            vec![mock_response(&frame["id"], json!({ "data": data }))]
        } else {
            Vec::new()
        }
    }
}

/// Subscription id of a `subscription.start` or `subscription.stop` frame
pub fn subscription_id(frame: &Value) -> String {
    frame["params"]["id"].as_str().unwrap_or_default().to_string()
}
