//! Bounded-duration retry with exponential backoff.
//!
//! The operation decides per attempt whether its failure may be retried.
//! A non-retryable failure ends the loop at once; retryable failures are
//! retried until the policy's deadline, after which the last error is returned.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

/// Classified failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

/// Retry timing.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wall-clock budget measured from the first attempt.
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Delay after the given failed attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    /// 5 minutes, starting at 500ms and capped at 10s between attempts.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `op` until it succeeds, fails non-retryably, or the deadline passes.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: Display,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempt: u32 = 0;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(e)) => return Err(e),
            Err(RetryError::Retryable(e)) => e,
        };

        let now = Instant::now();
        if now >= deadline {
            warn!(
                attempts = attempt + 1,
                timeout_secs = policy.timeout.as_secs(),
                "Giving up after deadline: {}",
                err
            );
            return Err(err);
        }

        let delay = policy.delay(attempt).min(deadline - now);
        let delay_ms = delay.as_millis() as u64;
        warn!(
            attempt = attempt + 1,
            delay_ms,
            "Retryable failure: {}",
            err
        );
        sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
