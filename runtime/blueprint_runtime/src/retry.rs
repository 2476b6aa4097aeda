//! C9 — retry policy for background/retryable operations.
//!
//! Matches spec.md's "final-attempt-only error-logger reporting": every
//! attempt before the last is rethrown silently, only the exhausted final
//! attempt logs at `error`, carrying the attempt count as `retry_count`
//! metadata.

use std::future::Future;
use std::time::Duration;

/// Exponential backoff: attempt `n` (0-indexed) waits `base_delay * 2^n`
/// before running, attempt 0 runs immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(31))
    }
}

/// Run `operation` up to `policy.max_attempts` times, retrying on `Err`.
/// Returns the first `Ok`, or the last `Err` once attempts are exhausted.
pub async fn run_with_retries<T, E, F, Fut>(policy: RetryPolicy, operation_name: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for(attempt - 1)).await;
        }
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                let is_final = attempt >= policy.max_attempts;
                if is_final {
                    tracing::error!(operation = operation_name, retry_count = attempt, error = %err, "operation failed, retries exhausted");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn succeeds_without_retrying_when_the_first_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(0));
        let result: Result<u32, &str> = run_with_retries(policy, "Test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_max_attempts_then_returns_the_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(0));
        let result: Result<u32, &str> = run_with_retries(policy, "Test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom")
        })
        .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_on_a_later_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(0));
        let result: Result<u32, &str> = run_with_retries(policy, "Test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 { Err("boom") } else { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
