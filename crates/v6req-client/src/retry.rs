//! Bounded retry with exponential backoff
//!
//! Only two outcomes are retried: a transport error, and a response the
//! server marked as rate limited (HTTP 429). Rate-limit waits start four
//! times longer than transport waits. Anything else is handed back on the
//! first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A response that may signal upstream rate limiting
pub trait RateLimitSignal {
    fn is_rate_limited(&self) -> bool;
}

impl RateLimitSignal for reqwest::Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }
}

/// Something that can wait between attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Waits on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy<S = TokioSleeper> {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,
    /// Wait before the second attempt after a transport error; doubles
    /// with every further attempt
    pub base_delay: Duration,
    sleeper: S,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_sleeper(max_attempts, TokioSleeper)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl<S: Sleeper> RetryPolicy<S> {
    pub fn with_sleeper(max_attempts: u32, sleeper: S) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
            sleeper,
        }
    }

    /// Wait after a transport error on zero-indexed `attempt`: 1s, 2s, 4s...
    pub fn transport_backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Wait after a 429 on zero-indexed `attempt`: 4s, 8s, 16s...
    pub fn rate_limit_backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_add(2)))
    }

    /// Run `request` until it yields something final
    ///
    /// Returns the first response that is not rate limited, or the last
    /// rate-limited response once attempts run out. A transport error on
    /// the final attempt is returned as is.
    pub async fn execute<F, Fut, R, E>(&self, mut request: F) -> Result<R, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: RateLimitSignal,
        E: Display,
    {
        let mut attempt = 0;

        loop {
            let is_last = attempt + 1 >= self.max_attempts;

            let wait = match request().await {
                Ok(response) if response.is_rate_limited() => {
                    if is_last {
                        return Ok(response);
                    }
                    // Dropping the response discards its body.
                    drop(response);
                    let wait = self.rate_limit_backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        wait = ?wait,
                        "Rate limited (429), retrying"
                    );
                    wait
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    if is_last {
                        return Err(e);
                    }
                    let wait = self.transport_backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        wait = ?wait,
                        error = %e,
                        "API request failed, retrying"
                    );
                    wait
                }
            };

            self.sleeper.sleep(wait).await;
            attempt += 1;
        }
    }
}
