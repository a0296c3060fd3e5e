pub mod states;

use crate::client::SyncClient;
use crate::config::{ClientConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS};
use crate::target::parse_endpoint;
use crate::traits::*;
use crate::ws_transport::TungsteniteTransport;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`SyncClient`]
///
/// This builder uses Rust's type system to enforce that the endpoint is set
/// before the client can be built. Everything else has a default:
///
/// - transport: [`TungsteniteTransport`]
/// - backoff: [`ExponentialBackoff`] with a 1s base
/// - max reconnect attempts: 5
/// - outbound queue: unbounded
/// - heartbeat: off
pub struct SyncClientBuilder<E>
where
    E: EndpointState,
{
    _state: TypeState<E>,
    endpoint: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    backoff: Option<Box<dyn BackoffPolicy>>,
    max_reconnect_attempts: u32,
    max_queued_messages: Option<usize>,
    heartbeat: Option<Duration>,
}

impl SyncClientBuilder<NoEndpoint> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            endpoint: None,
            transport: None,
            backoff: None,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            max_queued_messages: None,
            heartbeat: None,
        }
    }

    /// Set the base endpoint (ws:// or wss://)
    ///
    /// `userId` and `token` are appended as query parameters on every
    /// `connect()`.
    pub fn url(self, endpoint: impl Into<String>) -> SyncClientBuilder<HasEndpoint> {
        SyncClientBuilder {
            _state: TypeState::new(),
            endpoint: Some(endpoint.into()),
            transport: self.transport,
            backoff: self.backoff,
            max_reconnect_attempts: self.max_reconnect_attempts,
            max_queued_messages: self.max_queued_messages,
            heartbeat: self.heartbeat,
        }
    }
}

impl Default for SyncClientBuilder<NoEndpoint> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<E> SyncClientBuilder<E>
where
    E: EndpointState,
{
    /// Replace the default WebSocket transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn backoff(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Some(Box::new(policy));
        self
    }

    /// Cap on consecutive automatic reconnection attempts
    ///
    /// `0` disables automatic reconnection: the first failure closes the
    /// client and reports `max_reconnect_attempts_reached`.
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Bound the outbound queue; when full the oldest queued event is dropped
    pub fn max_queued_messages(mut self, capacity: usize) -> Self {
        self.max_queued_messages = Some(capacity);
        self
    }

    /// Send a ping control message every `interval` while connected
    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = Some(interval);
        self
    }
}

// Build method - only available once the endpoint is set
impl SyncClientBuilder<HasEndpoint> {
    pub fn build(self) -> Result<SyncClient> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| SyncError::Configuration("Endpoint must be set".to_string()))?;
        parse_endpoint(&endpoint)?;

        if self.heartbeat.is_some_and(|interval| interval.is_zero()) {
            return Err(SyncError::Configuration(
                "Heartbeat interval must be greater than zero".to_string(),
            ));
        }

        let config = ClientConfig {
            endpoint,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(TungsteniteTransport::new())),
            backoff: self
                .backoff
                .unwrap_or_else(|| Box::new(ExponentialBackoff::default())),
            max_reconnect_attempts: self.max_reconnect_attempts,
            max_queued_messages: self.max_queued_messages,
            heartbeat: self.heartbeat,
        };

        Ok(SyncClient::new(config))
    }
}
