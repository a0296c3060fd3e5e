//! # Sync client core
//!
//! The connection manager and the pieces it is built from:
//!
//! - **builder**: Type-state builder, the endpoint is the only required field
//! - **client**: [`SyncClient`], the state machine driving one logical connection
//! - **dispatcher**: Per-topic listener fan-out
//! - **registry** / **queue**: Subscriptions and offline sends that survive reconnects
//! - **retry** / **heartbeat**: Timers owned by the client
//! - **ws_transport**: Default `tokio-tungstenite` transport
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncsockets::{EventType, Event};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> syncsockets::Result<()> {
//!     let client = syncsockets::builder()
//!         .url("wss://rt.example.com/ws")
//!         .max_reconnect_attempts(5)
//!         .heartbeat(Duration::from_secs(25))
//!         .build()?;
//!
//!     client.on(EventType::BookingUpdate, |signal| {
//!         if let Some(event) = signal.as_event() {
//!             println!("booking {:?}: {}", event.booking_id(), event.payload());
//!         }
//!         Ok(())
//!     });
//!
//!     client.subscribe(["bookings"]);
//!     client.connect("u-42", Some("token"))?;
//!
//!     // Receive lifecycle events
//!     while let Ok(event) = client.recv_event() {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod event;
pub mod heartbeat;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod target;
pub mod ws_transport;

// Re-export main types
pub use builder::{states, SyncClientBuilder};
pub use client::{ClientEvent, Metrics, SyncClient};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use dispatcher::{EventDispatcher, Listener, ListenerId, Signal, Topic};
pub use event::{ControlAction, ControlMessage, Event, EventType};
pub use ws_transport::TungsteniteTransport;

/// Create a new sync client builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = syncsockets::builder()
///     .url("wss://rt.example.com/ws")
///     .backoff(FixedDelay::new(Duration::from_millis(500)))
///     .max_queued_messages(1_000)
///     .build()?;
/// ```
pub fn builder() -> SyncClientBuilder<builder::states::NoEndpoint> {
    SyncClientBuilder::new()
}
