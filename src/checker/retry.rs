// src/checker/retry.rs
// =============================================================================
// Retry with a fixed backoff.
//
// Network checks fail transiently all the time: a server answers 503 while
// deploying, a rate limiter answers 429, a connection times out. The loop
// below re-runs an async operation while a caller-supplied predicate says the
// result is worth retrying, waiting a fixed delay between attempts.
//
// Only the final result leaves this module; callers never see the
// intermediate failures. Every wait races against the cancellation token so
// a shutdown doesn't sit through the remaining retry budget.
// =============================================================================

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included (at least 1)
    pub attempts: u32,
    /// Pause between two attempts
    pub backoff: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            attempts: config.attempts.max(1),
            backoff: config.backoff(),
        }
    }
}

// Runs `operation` until it returns a result `retryable` rejects, or the
// attempts are used up
//
// `operation` receives the 1-based attempt number. Returns `None` if the
// token was cancelled before a final result was available.
pub async fn with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    retryable: P,
) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    let mut attempt = 1;
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return None,
            result = operation(attempt) => result,
        };

        if attempt >= policy.attempts || !retryable(&result) {
            return Some(result);
        }

        debug!(
            "Attempt {}/{} failed, retrying in {:?}",
            attempt, policy.attempts, policy.backoff
        );

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(policy.backoff) => {}
        }
        attempt += 1;
    }
}
