//! Bounded-retry condition polling
//!
//! [`poll_until`] is the one retry loop every verification goes through. A
//! timeout is a verdict ([`PollOutcome::TimedOut`]), not an error; only the
//! condition itself can end the loop with an error.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::cancel::CancellationToken;

/// Result of one evaluation of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The condition holds
    Ready(T),
    /// Not yet; the reason describes what is still missing
    Pending(String),
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut {
        attempts: u32,
        last_reason: Option<String>,
    },
    Cancelled {
        attempts: u32,
        last_reason: Option<String>,
    },
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }
}

/// Re-evaluates `condition` every `interval` until it is ready, returns an
/// error, `timeout` elapses, or `cancel` fires
///
/// The first attempt runs immediately. The last sleep is shortened so that a
/// final attempt runs at the deadline. A timeout too large to be represented
/// as an instant means no deadline. Errors from `condition` are returned
/// as-is and stop the loop; conditions should report transient failures as
/// [`Attempt::Pending`] instead.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
    mut condition: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut attempts = 0u32;
    let mut last_reason = None;

    loop {
        if cancel.is_cancelled() {
            return Ok(PollOutcome::Cancelled {
                attempts,
                last_reason,
            });
        }

        attempts += 1;
        match condition().await? {
            Attempt::Ready(value) => {
                debug!("Condition met after {} attempt(s)", attempts);
                return Ok(PollOutcome::Ready(value));
            }
            Attempt::Pending(reason) => {
                debug!("Attempt {} pending: {}", attempts, reason);
                last_reason = Some(reason);
            }
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(PollOutcome::TimedOut {
                        attempts,
                        last_reason,
                    });
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = cancel.cancelled() => {
                return Ok(PollOutcome::Cancelled {
                    attempts,
                    last_reason,
                });
            }
        }
    }
}
