//! # SyncSockets Traits
//!
//! Core traits and types shared by the client and its pluggable parts:
//!
//! - **BackoffPolicy**: Delay before each reconnection attempt
//! - **Transport**: Open connections and report their lifecycle
//! - **WsMessage**: Transport-level frames
//!
//! ## Example
//!
//! ```rust,ignore
//! use syncsockets::traits::*;
//!
//! struct Linear(Duration);
//!
//! impl BackoffPolicy for Linear {
//!     fn delay(&self, attempt: u32) -> Duration {
//!         self.0 * attempt
//!     }
//! }
//! ```

pub mod error;
pub mod message;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, SyncError};
pub use message::WsMessage;
pub use reconnect::{BackoffPolicy, ExponentialBackoff, FixedDelay};
pub use transport::{Transport, TransportLink, TransportSink};
