//! Keepalive pings for open connections
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. tick() ─────────┼──> SyncClient sends {"type":"ping"} if still on the
//! │  3. Repeat          │    same connection, else returns false
//! └─────────────────────┘
//! ```
//!
//! One task per connection. It ends when the client stops it, when `tick`
//! reports the connection is gone, or when the handle is dropped.

use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use tracing::debug;

/// Heartbeat loop
///
/// The task will:
/// 1. Wait for the first interval (skips immediate first tick)
/// 2. On each tick, call `tick`; stop when it returns `false`
/// 3. Stop early on a shutdown signal
pub async fn heartbeat_task<F>(interval: Duration, tick: F, shutdown_rx: Receiver<()>)
where
    F: Fn() -> bool + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        ticker.tick().await;

        match shutdown_rx.try_recv() {
            Ok(_) | Err(crossbeam_channel::TryRecvError::Disconnected) => {
                debug!("Heartbeat task received shutdown signal");
                break;
            }
            Err(crossbeam_channel::TryRecvError::Empty) => {}
        }

        if !tick() {
            debug!("Connection gone, stopping heartbeat");
            break;
        }
    }

    debug!("Heartbeat task exiting");
}

/// Running heartbeat, stopped on [`stop`](Self::stop) or drop
#[derive(Debug)]
pub struct HeartbeatHandle {
    shutdown_tx: Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Spawn a heartbeat task on the current tokio runtime
    ///
    /// Returns `None` when called outside a runtime.
    pub fn spawn<F>(interval: Duration, tick: F) -> Option<Self>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let handle = runtime.spawn(async move {
            heartbeat_task(interval, tick, shutdown_rx).await;
        });

        Some(Self {
            shutdown_tx,
            handle,
        })
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_interval_until_told_to_stop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let handle = HeartbeatHandle::spawn(Duration::from_secs(10), move || {
            counter.fetch_add(1, Ordering::SeqCst) < 2
        })
        .unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        drop(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_ticking() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);

        let handle = HeartbeatHandle::spawn(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.stop();
        let seen = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_spawn_outside_runtime_is_none() {
        assert!(HeartbeatHandle::spawn(Duration::from_secs(1), || true).is_none());
    }
}
