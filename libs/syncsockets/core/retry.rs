use crate::traits::{Result, SyncError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A scheduled reconnection attempt
///
/// Owns the timer task. Cancelling (or dropping) the timer aborts the task
/// so the callback never runs; a timer that already fired is detached with
/// [`fired`](Self::fired).
#[derive(Debug)]
pub struct RetryTimer {
    attempt: u32,
    delay: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RetryTimer {
    /// Run `fire` once `delay` has elapsed, on the current tokio runtime
    pub fn schedule<F>(attempt: u32, delay: Duration, fire: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SyncError::InvalidState(format!("Cannot schedule reconnection without a runtime: {}", e))
        })?;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });

        Ok(Self {
            attempt,
            delay,
            handle: Some(handle),
        })
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Abort the timer before it fires
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Release a timer whose callback is running, without aborting it
    pub fn fired(mut self) {
        self.handle.take();
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
