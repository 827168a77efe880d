//! Retry Mechanism Module
//!
//! Exponential backoff for the initial completion request. Per-chunk stream
//! reads are never retried; once a stream is open its failures end the turn.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::error::GatewayError;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        // No jitter and no elapsed-time cap: the attempt counter is the only bound.
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `operation`, retrying retryable failures according to `policy`.
///
/// Non-retryable errors (see [`GatewayError::is_retryable`]) are returned
/// immediately; the last error is returned once the retry budget is spent.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, GatewayError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, GatewayError>>,
{
    let attempts = AtomicU32::new(0);
    let max_retries = policy.max_retries;

    backoff::future::retry(policy.backoff(), || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        let fut = operation();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(err) if err.is_retryable() && attempt < max_retries => {
                    tracing::warn!(attempt = attempt + 1, error = %err, "retrying request");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        }
    })
    .await
}
