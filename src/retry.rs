//! Bounded retry with randomized pauses.
//!
//! [`RetryExecutor`] wraps any fallible async operation in a fixed attempt
//! budget with a uniform pause between attempts. It is used at two levels:
//! the account pipeline wraps its initialize and flow phases in it, and the
//! quest task wraps each quest item in it.
//!
//! Every failure is treated as retryable: a `false` result and an error are
//! handled identically. No distinction is made between transient and
//! permanent failures; the `on_attempt_failure` observer is the seam where a
//! classifier could be added.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::pacing::{PacingRng, SampleRange};

/// Default attempt budget when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Attempt budget and inter-attempt pause for a retryable operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    pause: SampleRange,
}

impl RetryPolicy {
    /// Creates a policy. An attempt budget of zero is clamped to one: every
    /// operation runs at least once.
    pub fn new(max_attempts: u32, pause: SampleRange) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            pause,
        }
    }

    /// Maximum number of attempts, always at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause range sampled between attempts.
    pub fn pause(&self) -> SampleRange {
        self.pause
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Creates an executor for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs `op` until it returns `Ok(true)` or the attempt budget is
    /// exhausted.
    ///
    /// Returns `true` on the first successful attempt, short-circuiting the
    /// remaining budget. `Ok(false)` and `Err(_)` both count as failed
    /// attempts. Between a failed attempt and the next one, never after the
    /// last, a pause sampled from the policy's range is slept.
    pub async fn execute<F, Fut>(&self, rng: &PacingRng, label: &str, op: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        self.execute_observed(rng, label, op, |_| {}).await
    }

    /// Like [`execute`](Self::execute), but invokes `on_attempt_failure`
    /// with the 1-based attempt number before each inter-attempt pause.
    pub async fn execute_observed<F, Fut, Obs>(
        &self,
        rng: &PacingRng,
        label: &str,
        mut op: F,
        mut on_attempt_failure: Obs,
    ) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
        Obs: FnMut(u32),
    {
        let budget = self.policy.max_attempts();
        for attempt in 1..=budget {
            match op().await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!("{label} | Attempt {attempt}/{budget} errored: {err:#}");
                }
            }

            if attempt < budget {
                on_attempt_failure(attempt);
                let pause = rng.sample(self.policy.pause());
                info!("{label} | Attempt {attempt}/{budget} failed, sleeping {pause}s");
                sleep(Duration::from_secs(pause)).await;
            }
        }
        warn!("{label} | All {budget} attempts failed");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, SampleRange::new(1, 3).expect("valid range"))
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(policy(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_failures() {
        let rng = PacingRng::seeded(1);
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);
        let pauses = AtomicU32::new(0);

        let result = executor
            .execute_observed(
                &rng,
                "[test] op",
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Ok(n >= 2)
                },
                |_| {
                    pauses.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(pauses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget_without_trailing_pause() {
        let rng = PacingRng::seeded(1);
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);
        let pauses = AtomicU32::new(0);

        let result = executor
            .execute_observed(
                &rng,
                "[test] op",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(false)
                },
                |_| {
                    pauses.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(!result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // The pause after the final attempt is never slept.
        assert_eq!(pauses.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_short_circuits() {
        let rng = PacingRng::seeded(1);
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute(&rng, "[test] op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
            .await;

        assert!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_retried_like_failures() {
        let rng = PacingRng::seeded(1);
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute(&rng, "[test] op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    anyhow::bail!("connection reset");
                }
                Ok(true)
            })
            .await;

        assert!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_budget_never_pauses() {
        let rng = PacingRng::seeded(1);
        let executor = RetryExecutor::new(policy(1));
        let pauses = AtomicU32::new(0);

        let result = executor
            .execute_observed(
                &rng,
                "[test] op",
                || async { Ok(false) },
                |_| {
                    pauses.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await;

        assert!(!result);
        assert_eq!(pauses.load(Ordering::SeqCst), 0);
    }
}
