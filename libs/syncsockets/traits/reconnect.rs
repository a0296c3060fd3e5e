use std::time::Duration;

/// Trait for computing the delay before a reconnection attempt
///
/// Policies are pure: they never refuse to compute a delay. Capping the
/// number of attempts is the client's job (see `max_reconnect_attempts`
/// on the builder).
pub trait BackoffPolicy: Send + Sync {
    /// Get the delay before the given reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (1-indexed)
    fn delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff policy
///
/// Delays between reconnection attempts double every time:
/// `base * 2^(attempt - 1)`, saturating at `Duration::MAX`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff policy
    ///
    /// # Arguments
    /// * `base` - The delay before the first reconnection attempt
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn base(&self) -> Duration {
        self.base
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        match 2u32.checked_pow(exponent) {
            Some(factor) => self.base.saturating_mul(factor),
            None if self.base.is_zero() => Duration::ZERO,
            None => Duration::MAX,
        }
    }
}

/// Fixed delay policy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a new fixed delay policy
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}
