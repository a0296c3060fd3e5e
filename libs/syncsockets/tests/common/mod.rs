//! Common test utilities for SyncSockets integration tests
//!
//! Two ways to drive a client:
//! - [`ScriptedTransport`]: the test decides when each attempt opens, fails
//!   or drops, and inspects every frame the client wrote
//! - [`MockWsServer`]: a real WebSocket server on localhost for end-to-end runs

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use syncsockets::{Result, SyncError, Transport, TransportLink, TransportSink, WsMessage};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Link that records every frame the client writes
#[derive(Clone, Default)]
pub struct RecordingLink {
    frames: Arc<Mutex<Vec<WsMessage>>>,
    closed: Arc<AtomicBool>,
    fail_after: Arc<Mutex<Option<usize>>>,
}

impl RecordingLink {
    pub fn frames(&self) -> Vec<WsMessage> {
        self.frames.lock().clone()
    }

    /// Frames as JSON values
    pub fn json(&self) -> Vec<Value> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| serde_json::from_slice(frame.as_bytes()).ok())
            .collect()
    }

    /// One line per frame: `subscribe:bookings`, `ping`, `event:e1`
    pub fn summary(&self) -> Vec<String> {
        self.json().iter().map(summarize).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Accept `n` more frames, then refuse every send
    pub fn fail_sends_after(&self, n: usize) {
        let limit = self.frames.lock().len() + n;
        *self.fail_after.lock() = Some(limit);
    }
}

impl TransportLink for RecordingLink {
    fn send(&self, message: WsMessage) -> Result<()> {
        if self.is_closed() {
            return Err(SyncError::ConnectionClosed("link closed".into()));
        }
        let mut frames = self.frames.lock();
        if let Some(limit) = *self.fail_after.lock() {
            if frames.len() >= limit {
                return Err(SyncError::WebSocket("write refused".into()));
            }
        }
        frames.push(message);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Summarize a wire frame for assertions
pub fn summarize(frame: &Value) -> String {
    let kind = frame["type"].as_str().unwrap_or_default();
    match kind {
        "subscribe" | "unsubscribe" => {
            format!("{}:{}", kind, frame["channel"].as_str().unwrap_or_default())
        }
        "ping" => "ping".to_string(),
        _ => format!("event:{}", frame["id"].as_str().unwrap_or_default()),
    }
}

struct Attempt {
    url: String,
    sink: Arc<dyn TransportSink>,
}

/// Transport whose attempts are resolved by the test
///
/// Every sink call happens outside the transport's own lock so the client
/// is free to call back into `open`.
#[derive(Default)]
pub struct ScriptedTransport {
    attempts: Mutex<Vec<Attempt>>,
    refuse: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `open` fail synchronously, as if no attempt could be issued
    pub fn refuse_opens(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    pub fn url(&self, attempt: usize) -> String {
        self.attempts.lock()[attempt].url.clone()
    }

    fn sink(&self, attempt: usize) -> Arc<dyn TransportSink> {
        Arc::clone(&self.attempts.lock()[attempt].sink)
    }

    /// Complete attempt `attempt` successfully
    pub fn accept(&self, attempt: usize) -> RecordingLink {
        self.accept_link(attempt, RecordingLink::default())
    }

    /// Complete attempt `attempt` with a link prepared by the test
    pub fn accept_link(&self, attempt: usize, link: RecordingLink) -> RecordingLink {
        self.sink(attempt).opened(Box::new(link.clone()));
        link
    }

    /// Fail attempt `attempt` before it opened
    pub fn reject(&self, attempt: usize, reason: &str) {
        self.sink(attempt).closed(reason.to_string());
    }

    /// Drop the open connection of attempt `attempt`
    pub fn drop_connection(&self, attempt: usize, reason: &str) {
        self.sink(attempt).closed(reason.to_string());
    }

    /// Deliver an inbound frame on attempt `attempt`
    pub fn deliver(&self, attempt: usize, frame: impl Into<WsMessage>) {
        self.sink(attempt).message(frame.into());
    }

    /// Deliver a JSON value as a text frame
    pub fn deliver_json(&self, attempt: usize, value: Value) {
        self.deliver(attempt, WsMessage::Text(value.to_string()));
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, url: &str, sink: Arc<dyn TransportSink>) -> Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(SyncError::WebSocket("transport unavailable".into()));
        }
        self.attempts.lock().push(Attempt {
            url: url.to_string(),
            sink,
        });
        Ok(())
    }
}

/// A mock WebSocket server for end-to-end tests
///
/// Text frames received from clients are forwarded to `received`; frames
/// passed to [`push`](Self::push) go to every connected client.
pub struct MockWsServer {
    pub addr: SocketAddr,
    pub received: mpsc::UnboundedReceiver<Value>,
    outbound: broadcast::Sender<String>,
    kick: Arc<Notify>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let kick = Arc::new(Notify::new());
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound, _) = broadcast::channel(64);

        let shutdown_clone = shutdown.clone();
        let kick_clone = kick.clone();
        let outbound_clone = outbound.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let received_tx = received_tx.clone();
                                let outbound_rx = outbound_clone.subscribe();
                                let kick = kick_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, received_tx, outbound_rx, kick).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            received,
            outbound,
            kick,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        received_tx: mpsc::UnboundedSender<Value>,
        mut outbound_rx: broadcast::Receiver<String>,
        kick: Arc<Notify>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::{accept_async, tungstenite::Message};

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(value) = serde_json::from_str(&text) {
                                let _ = received_tx.send(value);
                            }
                        }
                        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                        Some(Ok(_)) => {}
                    }
                }
                frame = outbound_rx.recv() => {
                    match frame {
                        Ok(text) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                _ = kick.notified() => {
                    // Drop without a close handshake
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Send a text frame to every connected client
    pub fn push(&self, value: Value) {
        let _ = self.outbound.send(value.to_string());
    }

    /// Abruptly drop every open connection
    pub fn drop_connections(&self) {
        self.kick.notify_waiters();
    }

    /// Next frame a client sent, waiting up to one second
    pub async fn next_frame(&mut self) -> Option<Value> {
        tokio::time::timeout(std::time::Duration::from_secs(1), self.received.recv())
            .await
            .ok()
            .flatten()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Wait until `condition` holds, polling for up to two seconds
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
