//! Retry engine.

use crate::{BackoffPolicy, CircuitBreaker};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use vigil_error::{RetryableError, VigilError, VigilErrorKind};

/// Default upper bound on a single attempt.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// One failed attempt of a retried call.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct RetryAttempt {
    /// Attempt number, starting at 1
    number: u32,
    /// Error the attempt ended with
    error: VigilError,
    /// When the attempt failed
    at: Instant,
}

/// A call that eventually succeeded.
#[derive(Debug, derive_getters::Getters)]
pub struct RetrySuccess<T> {
    /// Value produced by the successful attempt
    value: T,
    /// Attempts made, including the successful one
    attempts: u32,
    /// Attempts that failed before the success
    failures: Vec<RetryAttempt>,
}

impl<T> RetrySuccess<T> {
    /// Take the value.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// A call that did not succeed.
#[derive(Debug, derive_getters::Getters)]
pub struct RetryFailure {
    /// Error that ended the call
    error: VigilError,
    /// Every attempt that was actually made, in order
    attempts: Vec<RetryAttempt>,
}

impl RetryFailure {
    /// Take the final error.
    pub fn into_error(self) -> VigilError {
        self.error
    }
}

/// Executes operations with bounded retries and a shared circuit breaker.
///
/// Cloning the engine shares the breaker, so every clone sees the same
/// circuit state.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    breaker: Arc<CircuitBreaker>,
    attempt_timeout: Duration,
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new(Arc::new(CircuitBreaker::default()))
    }
}

impl RetryEngine {
    /// Create an engine around a breaker.
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            breaker,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Bound every attempt by `timeout`; an attempt that exceeds it fails with
    /// a retryable timeout error.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The shared breaker.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. Attempts are strictly
    /// sequential. An open circuit fails the call immediately without invoking
    /// `operation`. Cancelling `cancel` aborts the current attempt or backoff
    /// and prevents further attempts; cancellation is not counted against the
    /// breaker.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        policy: &BackoffPolicy,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<RetrySuccess<T>, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, VigilError>>,
    {
        self.execute_with_retry_notify(policy, cancel, operation, |_| {})
            .await
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but calls
    /// `notify` with every failed attempt as soon as it is recorded, before
    /// any backoff sleep or the next attempt.
    #[instrument(skip(self, policy, cancel, operation, notify), fields(max_attempts = policy.attempts()))]
    pub async fn execute_with_retry_notify<T, F, Fut, N>(
        &self,
        policy: &BackoffPolicy,
        cancel: &CancellationToken,
        mut operation: F,
        mut notify: N,
    ) -> Result<RetrySuccess<T>, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, VigilError>>,
        N: FnMut(&RetryAttempt),
    {
        let max_attempts = policy.attempts();
        let mut attempts = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(RetryFailure {
                    error: VigilError::new(VigilErrorKind::Cancelled),
                    attempts,
                });
            }

            if let Err(retry_after) = self.breaker.check() {
                debug!(attempt, retry_after_ms = retry_after.as_millis() as u64, "Circuit open, failing fast");
                return Err(RetryFailure {
                    error: VigilError::new(VigilErrorKind::CircuitOpen { retry_after }),
                    attempts,
                });
            }

            debug!(attempt, "Executing attempt");
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(VigilError::new(VigilErrorKind::Cancelled)),
                result = tokio::time::timeout(self.attempt_timeout, operation(attempt)) => {
                    result.unwrap_or_else(|_| Err(VigilError::new(VigilErrorKind::Timeout(self.attempt_timeout))))
                }
            };

            let error = match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(RetrySuccess {
                        value,
                        attempts: attempt,
                        failures: attempts,
                    });
                }
                Err(error) => error,
            };

            if matches!(error.kind(), VigilErrorKind::Cancelled) {
                debug!(attempt, "Attempt cancelled");
                return Err(RetryFailure { error, attempts });
            }

            if error.is_remote_failure() {
                self.breaker.record_failure();
            }

            let failed = RetryAttempt {
                number: attempt,
                error: error.clone(),
                at: Instant::now(),
            };
            notify(&failed);
            attempts.push(failed);

            if !error.is_retryable() {
                warn!(attempt, category = error.category(), "Error is not retryable, failing immediately");
                return Err(RetryFailure { error, attempts });
            }

            if attempt >= max_attempts {
                warn!(attempt, category = error.category(), "All retry attempts exhausted");
                return Err(RetryFailure { error, attempts });
            }

            let delay = policy.sample_delay(attempt);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                rate_limited = error.is_rate_limit(),
                "Retrying after failure"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryFailure {
                        error: VigilError::new(VigilErrorKind::Cancelled),
                        attempts,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
