use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Bounded retry schedule with linearly increasing delays: attempt `n`
/// (1-based) waits `step * n` before running again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub step: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, step: Duration) -> Self {
        Self { max_retries, step }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            step: Duration::ZERO,
        }
    }

    /// Delay before the given 1-based retry attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            step: Duration::from_secs(1),
        }
    }
}

/// Retries an async operation according to `policy`.
///
/// # Returns
/// Either the first successful result or the error from the final attempt
/// (total runs = 1 initial + `max_retries`).
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, policy.max_retries, err
                );
                tokio::time::sleep(policy.delay(attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_returns_first_success() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_gives_up_after_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;

        assert_eq!(result, Err("down".to_string()));
        // 1 initial run + 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_none_policy_runs_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = with_retry(&RetryPolicy::none(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_schedule_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(3));
    }
}
