use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default cap on consecutive automatic reconnection attempts
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Configuration for [`SyncClient`](crate::client::SyncClient)
///
/// Built with the type-state builder (`syncsockets::builder()`); the
/// endpoint is the only required field.
pub struct ClientConfig {
    /// Base endpoint (ws:// or wss://); identity is appended per connect
    pub(crate) endpoint: String,

    /// Opens connections
    pub(crate) transport: Arc<dyn Transport>,

    /// Delay before each automatic reconnection attempt
    pub(crate) backoff: Box<dyn BackoffPolicy>,

    /// Automatic reconnection stops once this many attempts were scheduled
    pub(crate) max_reconnect_attempts: u32,

    /// Outbound queue capacity (None = unbounded, drop-oldest when full)
    pub(crate) max_queued_messages: Option<usize>,

    /// Optional keepalive ping interval while connected
    pub(crate) heartbeat: Option<Duration>,
}

impl ClientConfig {
    /// Get a reference to the endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    pub fn max_queued_messages(&self) -> Option<usize> {
        self.max_queued_messages
    }

    /// Check if heartbeat is configured
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Delay the backoff policy assigns to `attempt`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("max_queued_messages", &self.max_queued_messages)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}
