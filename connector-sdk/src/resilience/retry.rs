//! Attempt loop with linear backoff and progressive timeouts
//!
//! Callers that talk to slow, flaky upstreams (LLM generation in particular)
//! get a bounded number of attempts. Each attempt receives its own timeout,
//! which grows with the attempt number, and failed attempts are followed by
//! a pause that grows linearly. Connection-level failures pause longer than
//! failures where the upstream did answer.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use thiserror::Error;

use crate::error::ServiceError;

/// Affine delay schedule: `base + step * n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBackoff {
    base: Duration,
    step: Duration,
    current: u32,
}

impl StepBackoff {
    /// Schedule starting at `base` and growing by `step` per index
    pub fn new(base: Duration, step: Duration) -> Self {
        Self {
            base,
            step,
            current: 0,
        }
    }

    /// Purely linear schedule (`step * n`)
    pub fn linear(step: Duration) -> Self {
        Self::new(Duration::ZERO, step)
    }

    /// Fresh copy of the schedule, positioned before its first pause
    pub fn start(&self) -> Self {
        Self { current: 0, ..*self }
    }
}

impl Backoff for StepBackoff {
    /// `base + step * n` for the n-th call
    fn next_backoff(&mut self) -> Option<Duration> {
        self.current += 1;
        Some(self.base + self.step * self.current)
    }

    fn reset(&mut self) {
        self.current = 0;
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Pause after a failure where the upstream responded (bad status, bad body)
    pub response_backoff: StepBackoff,

    /// Pause after a connection failure or timeout
    pub transport_backoff: StepBackoff,

    /// Timeout of the first attempt
    pub base_timeout: Duration,

    /// Extra timeout granted to each subsequent attempt
    pub timeout_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            response_backoff: StepBackoff::linear(Duration::from_secs(2)),
            transport_backoff: StepBackoff::linear(Duration::from_secs(3)),
            base_timeout: Duration::from_secs(60),
            timeout_step: Duration::from_secs(30),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryPolicy {{ max_attempts: {}, base_timeout: {:?}, timeout_step: {:?} }}",
            self.max_attempts, self.base_timeout, self.timeout_step
        )
    }
}

impl RetryPolicy {
    /// Timeout granted to the given (1-based) attempt
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout + self.timeout_step * attempt.saturating_sub(1)
    }

    /// Local configuration problems are never worth another attempt
    fn should_retry(&self, error: &ServiceError) -> bool {
        !matches!(error.root(), ServiceError::Configuration(_))
    }
}

/// Information handed to each attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,

    /// Timeout the attempt should apply to its upstream call
    pub timeout: Duration,
}

/// All attempts failed; carries the last cause
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {source}")]
pub struct RetryExhausted {
    pub attempts: u32,
    #[source]
    pub source: ServiceError,
}

/// Executor for the attempt loop
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation` until it succeeds or the policy gives up.
    ///
    /// On success returns the value together with the number of attempts used.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<(T, u32), RetryExhausted>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = crate::error::Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut response_backoff = self.policy.response_backoff.start();
        let mut transport_backoff = self.policy.transport_backoff.start();
        let mut number = 1;

        loop {
            let attempt = Attempt {
                number,
                timeout: self.policy.timeout_for(number),
            };

            match operation(attempt).await {
                Ok(value) => return Ok((value, number)),
                Err(err) if number < max_attempts && self.policy.should_retry(&err) => {
                    // Both schedules advance on every failure so each stays indexed by attempt
                    let response_delay = response_backoff.next_backoff();
                    let transport_delay = transport_backoff.next_backoff();
                    let delay = if err.is_transport() {
                        transport_delay
                    } else {
                        response_delay
                    }
                    .unwrap_or(Duration::ZERO);
                    log::warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        number,
                        max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    number += 1;
                }
                Err(err) => {
                    log::error!("Giving up after {} attempt(s): {}", number, err);
                    return Err(RetryExhausted {
                        attempts: number,
                        source: err,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_successful_operation() {
        let retry = RetryExecutor::default();
        let result = retry
            .execute(|_| async { Ok::<_, ServiceError>(42) })
            .await
            .unwrap();
        assert_eq!(result, (42, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_then_success() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let retry = RetryExecutor::default();

        let starts_clone = Arc::clone(&starts);
        let result = retry
            .execute(move |attempt| {
                let starts = Arc::clone(&starts_clone);
                async move {
                    starts.lock().unwrap().push(tokio::time::Instant::now());
                    if attempt.number < 3 {
                        Err(ServiceError::network("connection reset"))
                    } else {
                        Ok(attempt.timeout)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, (Duration::from_secs(120), 3));

        let starts = starts.lock().unwrap();
        let before_second = starts[1] - starts[0];
        let before_third = starts[2] - starts[1];
        assert_eq!(before_second, Duration::from_secs(3));
        assert_eq!(before_third, Duration::from_secs(6));
        assert!(before_third > before_second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_failures_keep_attempt_indexed_pauses() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let retry = RetryExecutor::new(RetryPolicy {
            max_attempts: 4,
            ..RetryPolicy::default()
        });

        let starts_clone = Arc::clone(&starts);
        let result = retry
            .execute(move |attempt| {
                let starts = Arc::clone(&starts_clone);
                async move {
                    starts.lock().unwrap().push(tokio::time::Instant::now());
                    match attempt.number {
                        1 => Err(ServiceError::parsing("not json")),
                        2 => Err(ServiceError::timeout("slow")),
                        3 => Err(ServiceError::parsing("still not json")),
                        _ => Ok("done"),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, ("done", 4));

        let starts = starts.lock().unwrap();
        // 2s x 1 after a bad answer, 3s x 2 after a timeout, 2s x 3 after a bad answer
        assert_eq!(starts[1] - starts[0], Duration::from_secs(2));
        assert_eq!(starts[2] - starts[1], Duration::from_secs(6));
        assert_eq!(starts[3] - starts[2], Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_run_restarts_the_schedule() {
        let retry = RetryExecutor::default();
        for _ in 0..2 {
            let started = tokio::time::Instant::now();
            let result = retry
                .execute(|attempt| async move {
                    if attempt.number == 1 {
                        Err(ServiceError::network("reset"))
                    } else {
                        Ok(())
                    }
                })
                .await;
            assert!(result.is_ok());
            assert_eq!(started.elapsed(), Duration::from_secs(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempts() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let retry = RetryExecutor::default();
        let attempt_count_clone = Arc::clone(&attempt_count);

        let err = retry
            .execute(move |_| {
                let count = Arc::clone(&attempt_count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ServiceError::upstream(503, "unavailable"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.source.status_code(), Some(503));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_configuration_error_is_not_retried() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let retry = RetryExecutor::default();
        let attempt_count_clone = Arc::clone(&attempt_count);

        let err = retry
            .execute(move |_| {
                let count = Arc::clone(&attempt_count_clone);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ServiceError::configuration("missing api key"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_progressive_timeouts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout_for(1), Duration::from_secs(60));
        assert_eq!(policy.timeout_for(2), Duration::from_secs(90));
        assert_eq!(policy.timeout_for(3), Duration::from_secs(120));
    }

    #[test]
    fn test_step_backoff_sequence() {
        let mut spacing = StepBackoff::new(Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(spacing.next_backoff(), Some(Duration::from_secs(15)));
        assert_eq!(spacing.next_backoff(), Some(Duration::from_secs(20)));
        spacing.reset();
        assert_eq!(spacing.next_backoff(), Some(Duration::from_secs(15)));

        let mut restarted = spacing.start();
        assert_eq!(restarted.next_backoff(), Some(Duration::from_secs(15)));
    }
}
