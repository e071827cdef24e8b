//! Bounded retries with linear backoff.
//!
//! Attempts run strictly one after another. Between attempts the loop waits
//! `retry_delay * attempt`; both the wait and the attempt itself race the
//! caller's cancellation token.
//!
//! Failures come in two flavours:
//! - [`AttemptError::Fatal`] ends the loop immediately (classified statuses,
//!   malformed payloads).
//! - [`AttemptError::Retryable`] consumes one unit of the retry budget.

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::error::{AttemptFailure, GatewayError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const MAX_RETRIES_LIMIT: u32 = 5;

#[derive(Debug)]
pub enum AttemptError {
    Retryable(AttemptFailure),
    Fatal(GatewayError),
}

impl From<GatewayError> for AttemptError {
    fn from(err: GatewayError) -> Self {
        AttemptError::Fatal(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self { max_retries, retry_delay }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self { max_retries: 0, retry_delay: Duration::ZERO }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before attempt number `attempt` (the first attempt is 0).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds, fails fatally, runs out of budget
    /// or `cancel` fires. The closure receives the zero-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut last_failure = None;

        for attempt in 0..self.total_attempts() {
            if cancel.is_cancelled() {
                tracing::debug!(attempt, "cancelled before attempt");
                return Err(GatewayError::Cancelled);
            }

            if attempt > 0 {
                let delay = self.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    total = self.total_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "retrying upstream call"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(attempt, "cancelled during backoff");
                        return Err(GatewayError::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(attempt, "cancelled during attempt");
                    return Err(GatewayError::Cancelled);
                }
                outcome = operation(attempt) => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "upstream call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(AttemptError::Fatal(err)) => {
                    tracing::debug!(attempt = attempt + 1, kind = %err.kind(), "non-retryable failure");
                    return Err(err);
                }
                Err(AttemptError::Retryable(failure)) => {
                    tracing::warn!(attempt = attempt + 1, error = %failure, "upstream attempt failed");
                    last_failure = Some(failure);
                }
            }
        }

        let attempts = self.total_attempts();
        tracing::error!(attempts, "all upstream attempts exhausted");

        match last_failure {
            Some(cause) => Err(GatewayError::NetworkFailure {
                message: format!("Weather API call failed after {attempts} attempt(s): {cause}"),
                status: cause.status(),
                cause,
            }),
            // total_attempts() is at least one, so the loop always records a failure
            None => Err(GatewayError::Unknown {
                message: "retry loop finished without an attempt".to_string(),
                status: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use tokio::time::Instant;

    use super::*;
    use crate::{error::ErrorKind, transport::TransportError};

    fn timeout() -> AttemptError {
        AttemptError::Retryable(AttemptFailure::Transport(TransportError::Timeout(
            "deadline elapsed".into(),
        )))
    }

    #[test]
    fn delay_is_linear() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn total_attempts_includes_first_try() {
        assert_eq!(RetryPolicy::new(2, Duration::ZERO).total_attempts(), 3);
        assert_eq!(RetryPolicy::no_retry().total_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_with_linear_delays() {
        let policy = RetryPolicy::new(2, Duration::from_millis(500));
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let mut started_at = Vec::new();

        let result: Result<(), _> = policy
            .run(&cancel, |_| {
                started_at.push(start.elapsed());
                async { Err(timeout()) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
        assert_eq!(
            started_at,
            vec![Duration::ZERO, Duration::from_millis(500), Duration::from_millis(1500)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_immediately() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(&cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Fatal(GatewayError::malformed("no weather block"))) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedResponse);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failure() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let value = policy
            .run(&cancel, |attempt| async move {
                if attempt == 0 { Err(timeout()) } else { Ok(attempt) }
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_keeps_last_status() {
        let policy = RetryPolicy::new(1, Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let err = policy
            .run::<(), _, _>(&cancel, |_| async {
                Err(AttemptError::Retryable(AttemptFailure::Status {
                    status: 500,
                    body: "boom".into(),
                }))
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_stops_without_sleeping_further() {
        let delay = Duration::from_secs(30);
        let policy = RetryPolicy::new(2, delay);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay / 2).await;
            token.cancel();
        });

        let result: Result<(), _> = policy
            .run(&cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout()) }
            })
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), delay / 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_attempt_stops_the_loop() {
        let policy = RetryPolicy::new(2, Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let token = cancel.clone();
        let counter = calls.clone();
        let result: Result<(), _> = policy
            .run(&cancel, move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 2 {
                    token.cancel();
                }
                async { Err(timeout()) }
            })
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_makes_no_attempt() {
        let policy = RetryPolicy::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(&cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout()) }
            })
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
