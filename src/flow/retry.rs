//! Bounded retry for scoring-branch invocations.
//!
//! An explicit policy object composed around each branch: the wrapped
//! operation must be idempotent from the caller's perspective, because the
//! same input is replayed on every attempt.

use std::future::Future;

use crate::error::EvaluationError;

/// Retry policy for one branch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl RetryPolicy {
    /// Build a policy; at least one attempt always runs.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// The operation receives the 1-based attempt number for observability.
    /// Only retryable errors (transient external failures) are repeated;
    /// validation and rubric-data errors return immediately. On exhaustion
    /// the last error propagates, which is fatal for the evaluation.
    pub async fn run<T, F, Fut>(
        &self,
        branch: &'static str,
        mut op: F,
    ) -> Result<T, EvaluationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, EvaluationError>>,
    {
        let mut last_error: Option<EvaluationError> = None;

        for attempt in 1..=self.max_attempts.max(1) {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("{branch} succeeded on attempt {attempt}");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    log::warn!(
                        "{branch} attempt {attempt}/{} failed: {err}",
                        self.max_attempts
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        log::error!("{branch} exhausted all {} attempts", self.max_attempts);
        Err(last_error.unwrap_or_else(|| {
            EvaluationError::Internal(format!("{branch}: retry loop exited without an error"))
        }))
    }
}
