//! Transport seam
//!
//! The client never touches a socket directly. It asks a [`Transport`] to
//! open a connection and learns the outcome through a [`TransportSink`]:
//!
//! ```text
//! SyncClient ──open(url, sink)──> Transport ──(async)──> sink.opened(link)
//!                                                        sink.message(frame)*
//!                                                        sink.closed(reason)
//! ```
//!
//! Each open attempt gets its own sink. Once `closed` has been reported the
//! sink must not be used again.

use crate::error::Result;
use crate::message::WsMessage;
use std::sync::Arc;

/// Write half of an open connection, owned exclusively by the client
pub trait TransportLink: Send + Sync {
    /// Hand a frame to the transport without blocking
    ///
    /// `Ok(())` means the transport accepted the frame for writing.
    fn send(&self, message: WsMessage) -> Result<()>;

    /// Close the connection. Idempotent.
    fn close(&self);
}

/// Receives the outcome of one open attempt and the traffic that follows
pub trait TransportSink: Send + Sync {
    /// The connection is open and ready for writes
    fn opened(&self, link: Box<dyn TransportLink>);

    /// A frame arrived from the server
    fn message(&self, message: WsMessage);

    /// The attempt failed or the open connection ended
    fn closed(&self, reason: String);
}

/// Factory for connections
///
/// `open` only issues the attempt. It must return quickly and report the
/// outcome later through `sink`, never from inside `open` itself.
pub trait Transport: Send + Sync + 'static {
    /// Start connecting to `url`
    ///
    /// # Returns
    /// * `Ok(())` - The attempt was issued
    /// * `Err(SyncError)` - The attempt could not be issued (bad URL, no runtime)
    fn open(&self, url: &str, sink: Arc<dyn TransportSink>) -> Result<()>;
}
