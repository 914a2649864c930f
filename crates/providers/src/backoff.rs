//! Bounded retry with exponential backoff on rate limiting.
//!
//! Only [`ProviderError::RateLimited`] is retried. Every other error class
//! propagates on the first occurrence. When attempts run out the last
//! rate-limit error is returned unchanged so callers can degrade.
//!
//! A `Retry-After` hint from the backend raises the wait for that retry,
//! up to [`MAX_RETRY_AFTER`]; it never shortens the exponential delay.

use parley_config::BackoffConfig;
use parley_core::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Longest backend `Retry-After` hint that is honored.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Retry policy for backend calls.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Total attempts, including the first (1 = no retry).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&BackoffConfig::default())
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(config: &BackoffConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Delay before retry number `retry` after `err`: the exponential delay,
    /// raised to the backend's hint when that is longer.
    pub fn delay_after(&self, retry: u32, err: &ProviderError) -> Duration {
        let computed = self.delay_for_retry(retry);
        match err.retry_after() {
            Some(hint) => computed.max(hint.min(MAX_RETRY_AFTER)),
            None => computed,
        }
    }

    /// Run `op` until it succeeds, fails with a non-rate-limit error, or
    /// the attempt cap is reached.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limited() && attempt + 1 < attempts => {
                    let delay = self.delay_after(attempt, &e);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_rate_limited() {
                        warn!(attempts, "Rate limited, retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn limited() -> ProviderError {
        ProviderError::RateLimited {
            retry_after_secs: 1,
        }
    }

    #[test]
    fn delay_doubles_per_retry() {
        let policy = BackoffPolicy::new(4, Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(4));
    }

    #[test]
    fn policy_from_config() {
        let policy = BackoffPolicy::from(&BackoffConfig {
            max_attempts: 2,
            base_delay_ms: 250,
        });
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn success_needs_one_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = BackoffPolicy::new(3, Duration::from_secs(1));
        let result = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limit_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = BackoffPolicy::new(3, Duration::from_secs(1));
        let start = tokio::time::Instant::now();

        let result = policy
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(limited())
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 1s before the second attempt, 2s before the third
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn retry_after_hint_is_a_capped_floor() {
        let policy = BackoffPolicy::new(4, Duration::from_secs(1));
        let hint = |secs| ProviderError::RateLimited {
            retry_after_secs: secs,
        };

        assert_eq!(policy.delay_after(0, &hint(5)), Duration::from_secs(5));
        // A shorter hint does not cut the computed delay
        assert_eq!(policy.delay_after(2, &hint(1)), Duration::from_secs(4));
        assert_eq!(policy.delay_after(0, &hint(0)), Duration::from_secs(1));
        assert_eq!(policy.delay_after(0, &hint(3600)), MAX_RETRY_AFTER);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_hint_extends_the_wait() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = BackoffPolicy::new(2, Duration::from_millis(10));
        let start = tokio::time::Instant::now();

        let result = policy
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::RateLimited {
                        retry_after_secs: 7,
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_return_rate_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = BackoffPolicy::new(3, Duration::from_millis(10));

        let err = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(limited())
            })
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = BackoffPolicy::new(5, Duration::from_secs(1));

        let err = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ProviderError::ApiError {
                    status_code: 500,
                    message: "boom".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_never_sleeps() {
        let policy = BackoffPolicy::new(1, Duration::from_secs(60));
        let start = tokio::time::Instant::now();
        let err = policy
            .run(|| async move { Err::<(), _>(limited()) })
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
