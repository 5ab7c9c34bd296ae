//! Read resilience policy shared by every synchronized resource.

use std::future::Future;
use std::time::Duration;

use crate::api::ApiError;

const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Retry schedule for idempotent reads.
///
/// Each entry is the delay before one more attempt, so `delays.len() + 1`
/// attempts are made at most. Only transient failures are retried; writes
/// never go through this policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub const fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    pub const fn none() -> Self {
        Self::new(Vec::new())
    }

    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0usize;

        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let delay = self
                        .delays
                        .get(attempt)
                        .copied()
                        .filter(|_| error.is_transient());
                    let Some(delay) = delay else {
                        return Err(error);
                    };

                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        "Transient failure, retrying in {}ms: {}",
                        delay.as_millis(),
                        error
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(vec![Duration::from_millis(DEFAULT_RETRY_DELAY_MS)])
    }
}
