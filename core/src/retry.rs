//! Bounded retry with exponential backoff for single network calls.

use crate::Result;
use log::debug;
use std::future::Future;
use std::time::Duration;

/// Retry policy for transient failures.
///
/// `max_attempts` counts invocations of the operation, not waits: with
/// `max_attempts = 3` the operation runs at most three times, sleeping
/// `initial_delay * multiplier^i` after the i-th failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: usize,
    initial_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: usize, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier,
        }
    }

    /// Maximum number of invocations of the wrapped operation.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The delay slept after the given zero-based failed attempt.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        self.initial_delay.mul_f64(self.multiplier.powi(attempt as i32))
    }
}

/// Run `op` under the retry policy.
///
/// Only transient errors ([`crate::Error::is_transient`]) are retried;
/// validation, configuration and provider errors propagate on the first
/// attempt. The last transient failure is propagated with its detail intact.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                debug!(
                    "attempt {}/{} failed transiently, retrying in {:?}: {}",
                    attempt + 1,
                    policy.max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
