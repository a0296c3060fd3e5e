//! Default transport over `tokio-tungstenite`
//!
//! Each `open` spawns one connection task:
//!
//! ```text
//! connect_async ──ok──> sink.opened(link) ──> select! {
//!      │                                        read.next()  -> sink.message(frame)
//!      │ err / timeout                          link rx      -> write.send(frame)
//!      ▼                                      }
//! sink.closed(reason)   <────────── stream error / close frame / link closed
//! ```

use crate::traits::*;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Default time allowed for the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// WebSocket transport backed by `tokio-tungstenite`
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    connect_timeout: Duration,
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Fail an attempt whose handshake takes longer than `timeout`
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TungsteniteTransport {
    fn open(&self, url: &str, sink: Arc<dyn TransportSink>) -> Result<()> {
        let request = url
            .into_client_request()
            .map_err(|e| SyncError::Configuration(format!("Failed to create request: {}", e)))?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SyncError::InvalidState(format!("No tokio runtime: {}", e)))?;

        runtime.spawn(run_connection(request, sink, self.connect_timeout));
        Ok(())
    }
}

/// Commands from the client to the connection task
#[derive(Debug)]
enum LinkCommand {
    Send(WsMessage),
    Close,
}

/// Write half handed to the client
struct TungsteniteLink {
    tx: mpsc::UnboundedSender<LinkCommand>,
}

impl TransportLink for TungsteniteLink {
    fn send(&self, message: WsMessage) -> Result<()> {
        self.tx
            .send(LinkCommand::Send(message))
            .map_err(|_| SyncError::ConnectionClosed("Connection task has exited".into()))
    }

    fn close(&self) {
        let _ = self.tx.send(LinkCommand::Close);
    }
}

/// One connection, from handshake to close
async fn run_connection(request: Request, sink: Arc<dyn TransportSink>, connect_timeout: Duration) {
    let handshake = tokio::time::timeout(connect_timeout, connect_async(request)).await;

    let ws_stream = match handshake {
        Ok(Ok((ws_stream, _))) => ws_stream,
        Ok(Err(e)) => {
            warn!("Failed to connect: {}", e);
            sink.closed(e.to_string());
            return;
        }
        Err(_) => {
            warn!("Connection attempt timed out after {:?}", connect_timeout);
            sink.closed(format!("Handshake timed out after {:?}", connect_timeout));
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    sink.opened(Box::new(TungsteniteLink { tx }));

    let reason = loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => format!("Server closed connection: {} {}", frame.code, frame.reason),
                            None => "Server closed connection".to_string(),
                        };
                    }
                    Some(Ok(msg)) => {
                        if let Some(ws_msg) = tungstenite_to_ws_message(msg) {
                            sink.message(ws_msg);
                        }
                    }
                    Some(Err(e)) => break format!("WebSocket error: {}", e),
                    None => break "Stream ended".to_string(),
                }
            }

            cmd = rx.recv() => {
                match cmd {
                    Some(LinkCommand::Send(msg)) => {
                        if let Err(e) = write.send(ws_message_to_tungstenite(msg)).await {
                            break format!("Failed to send: {}", e);
                        }
                    }
                    Some(LinkCommand::Close) | None => {
                        debug!("Closing connection on client request");
                        let _ = write.close().await;
                        break "Closed by client".to_string();
                    }
                }
            }
        }
    };

    debug!("Connection task exiting: {}", reason);
    sink.closed(reason);
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSink;

    impl TransportSink for NullSink {
        fn opened(&self, link: Box<dyn TransportLink>) {
            link.close();
        }
        fn message(&self, _message: WsMessage) {}
        fn closed(&self, _reason: String) {}
    }

    #[test]
    fn test_open_rejects_unparseable_url() {
        let transport = TungsteniteTransport::new();
        let result = transport.open("definitely not a url", Arc::new(NullSink));
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_open_requires_runtime() {
        let transport = TungsteniteTransport::new();
        let result = transport.open("ws://127.0.0.1:9/", Arc::new(NullSink));
        assert!(matches!(result, Err(SyncError::InvalidState(_))));
    }

    #[test]
    fn test_frame_conversion() {
        let text = ws_message_to_tungstenite(WsMessage::Text("hi".into()));
        assert_eq!(tungstenite_to_ws_message(text), Some(WsMessage::Text("hi".into())));
        assert_eq!(tungstenite_to_ws_message(Message::Ping(vec![1])), None);
    }
}
