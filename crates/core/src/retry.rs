//! Bounded retry with exponential backoff.
//!
//! Transient failures (see [`AppError::is_retryable`]) from the embedding
//! provider and the vector store are retried here and nowhere else. Once the
//! attempts are exhausted the last error is returned to the caller unchanged.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default number of attempts (including the first one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt, doubled after every failure.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Retry budget for one external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
        }
    }

    /// Default backoff with `retries` retries after the first attempt.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before attempt number `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
///
/// `operation` names the call in log lines.
pub async fn with_backoff<T, F, Fut>(policy: RetryPolicy, operation: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    operation,
                    attempt,
                    max_attempts,
                    backoff.as_millis(),
                    e
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!("{} failed after {} attempt(s): {}", operation, attempt, e);
                }
                return Err(e);
            }
        }
    }
}

/// Run `fut` with a deadline, mapping expiry to `on_timeout`.
///
/// Timeouts are reported in the same category as a hard connection error.
pub async fn with_timeout<T, Fut>(
    timeout: Duration,
    fut: Fut,
    on_timeout: impl FnOnce() -> AppError,
) -> AppResult<T>
where
    Fut: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
