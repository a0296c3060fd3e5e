//! # SyncSockets
//!
//! Real-time event synchronization client for booking, fleet and chat
//! updates over a persistent WebSocket.
//!
//! ## Features
//!
//! - **Automatic reconnection**: Pluggable backoff with a cap on consecutive attempts
//! - **Durable interest**: Subscriptions are replayed on every reconnect
//! - **Offline sends**: Outbound events queue while disconnected and flush in order
//! - **Typed fan-out**: Listeners per event type, isolated from each other's failures
//! - **Type-state builder**: Compile-time guarantee that the endpoint is set

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use crate::core::{
    builder, client, config, connection_state, dispatcher, event, heartbeat, queue, registry,
    retry, target, ws_transport,
    builder::{states, SyncClientBuilder},
    client::{ClientEvent, Metrics, SyncClient},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    dispatcher::{EventDispatcher, Listener, ListenerId, Signal, Topic},
    event::{ControlAction, ControlMessage, Event, EventType},
    ws_transport::TungsteniteTransport,
};

// Convenience function
pub use crate::core::builder as client_builder;
