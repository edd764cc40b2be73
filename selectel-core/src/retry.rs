//! Transport retries with exponential backoff
//!
//! Used beneath waiter refresh closures and single API reads, so a network
//! blip does not fail a long-running wait.

use std::cmp;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause before the first retry
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);

/// Default upper bound for the pause between retries
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(5);

/// Errors that know whether repeating the request could help
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait_min: Duration,
    pub wait_max: Duration,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_wait(mut self, wait_min: Duration, wait_max: Duration) -> Self {
        self.wait_min = wait_min;
        self.wait_max = wait_max;
        self
    }

    /// Pause before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        cmp::min(
            self.wait_min.saturating_mul(factor),
            cmp::max(self.wait_max, self.wait_min),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            wait_min: DEFAULT_RETRY_WAIT_MIN,
            wait_max: DEFAULT_RETRY_WAIT_MAX,
        }
    }
}

/// Run `operation`, retrying retryable errors according to `policy`
///
/// Non-retryable errors and the error of the last attempt are returned
/// unchanged. Cancellation during a backoff pause returns the error that
/// caused the pause.
pub async fn retry_transient<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        attempt += 1;
        if attempt > policy.max_retries {
            warn!("request failed after {} attempts: {}", attempt, err);
            return Err(err);
        }

        let pause = policy.backoff(attempt);
        debug!(
            "request failed (attempt {}/{}): {}. Retrying in {:?}",
            attempt,
            policy.max_retries + 1,
            err,
            pause
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(err),
            _ = tokio::time::sleep(pause) => {}
        }
    }
}
