//! Retry Policy
//!
//! One backoff policy shared by the text generation client and both Google
//! API clients. The schedule is exact doubling: after failed attempt `n` the
//! policy sleeps `base * 2^(n-1)` before trying again. `backon` drives the
//! loop; only errors classified as transient are retried.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::Retryable;
use tracing::warn;

use crate::constants::retry as retry_constants;
use crate::types::SeoError;

/// Retry/backoff policy parameterized by attempt count and base delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (always >= 1)
    max_attempts: usize,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            retry_constants::DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(retry_constants::BASE_DELAY_MS),
        )
    }
}

/// The policy gave up; carries the final error and how many attempts were made
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: usize,
    pub last_error: SeoError,
}

impl RetryExhausted {
    pub fn into_inner(self) -> SeoError {
        self.last_error
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay slept after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Full backoff schedule (one entry per retry)
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|n| self.delay_after(n)).collect()
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> std::result::Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, SeoError>>,
    {
        let attempts = AtomicUsize::new(0);

        let result = (|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            operation()
        })
        .retry(self.schedule().into_iter())
        .when(SeoError::is_retryable)
        .notify(|err: &SeoError, delay: Duration| {
            warn!(
                operation = operation_name,
                attempt = attempts.load(Ordering::Relaxed),
                delay_ms = delay.as_millis() as u64,
                category = %err.category(),
                error = %err,
                "Transient failure, backing off"
            );
        })
        .await;

        result.map_err(|last_error| RetryExhausted {
            attempts: attempts.load(Ordering::Relaxed),
            last_error,
        })
    }
}
