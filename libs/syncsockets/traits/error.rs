use thiserror::Error;

/// Main error type for syncsockets
#[derive(Error, Debug)]
pub enum SyncError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed while an operation needed it
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Inbound frame did not match the wire format
    #[error("Parse error: {0}")]
    Parse(String),

    /// Outbound message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error (bad endpoint, bad builder values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A listener reported a failure while handling a signal
    #[error("Listener error: {0}")]
    Listener(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for syncsockets operations
pub type Result<T> = std::result::Result<T, SyncError>;
