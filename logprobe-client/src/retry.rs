//! Transport-level retry with exponential backoff
//!
//! Retries a single HTTP call a bounded number of times when the failure is
//! transient. This sits below any outer polling: a connection reset is cheaper
//! to retry right away than to wait for the next poll.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

/// Bounded attempts with a doubling delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before attempt `attempt + 1` (attempts are 1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are exhausted
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded after {} attempt(s)", what, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
