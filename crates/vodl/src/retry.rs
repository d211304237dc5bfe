// Fixed-delay retry runner shared by every network call in the engine.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{AttemptError, VodError};

/// Retry ceiling and the fixed pause between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Wait between two consecutive attempts. No backoff, no jitter.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Result of a single attempt.
pub enum RetryAction<T> {
    Success(T),
    /// Transient failure; try again if attempts remain.
    Retry(AttemptError),
    /// Permanent failure; stop immediately.
    Fail(VodError),
}

/// Runs `operation` until it succeeds, fails permanently or the attempts run out.
///
/// `operation` receives the 1-based attempt number. Both the attempt and the
/// pause after it race `token`; cancellation returns [`VodError::Cancelled`].
pub async fn retry_with_delay<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    url: &str,
    operation: F,
) -> Result<T, VodError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = RetryAction<T>>,
{
    if policy.max_attempts == 0 {
        return Err(VodError::configuration("max_attempts must be at least 1"));
    }

    let mut attempt = 1;
    loop {
        if token.is_cancelled() {
            return Err(VodError::Cancelled);
        }

        let action = tokio::select! {
            _ = token.cancelled() => return Err(VodError::Cancelled),
            action = operation(attempt) => action,
        };

        match action {
            RetryAction::Success(value) => return Ok(value),
            RetryAction::Fail(err) => return Err(err),
            RetryAction::Retry(err) if attempt >= policy.max_attempts => {
                return Err(VodError::FetchExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last_error: err,
                });
            }
            RetryAction::Retry(err) => {
                warn!(
                    attempt,
                    max = policy.max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    url,
                    error = %err,
                    "Attempt failed, retrying"
                );
                tokio::select! {
                    _ = token.cancelled() => return Err(VodError::Cancelled),
                    _ = tokio::time::sleep(policy.delay) => {}
                }
                attempt += 1;
            }
        }
    }
}
