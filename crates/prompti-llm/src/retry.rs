//! Exponential backoff for transport failures

use std::future::Future;
use std::time::Duration;

use prompti_config::{RetryConfig, parse_duration};
use rand::Rng;

use crate::error::LlmError;

/// How often and how patiently a call is retried
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the base delay added as uniform random jitter
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = anyhow::Error;

    fn try_from(config: &RetryConfig) -> Result<Self, Self::Error> {
        config.validate()?;

        Ok(Self {
            max_attempts: config.max_attempts,
            initial_delay: parse_duration(&config.initial_delay)?,
            max_delay: parse_duration(&config.max_delay)?,
            multiplier: config.multiplier,
            jitter: config.jitter,
        })
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if secs.is_finite() && secs < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }

    /// Base delay plus a random share of up to `jitter` of it
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter <= 0.0 {
            return base;
        }

        let extra = rand::rng().random_range(0.0..=self.jitter);
        base.mul_f64(1.0 + extra)
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent
///
/// `call` receives the 1-based attempt number and must redo the whole
/// operation each time.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last retryable one once
/// `policy.max_attempts` is reached
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 1;

    loop {
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "retrying after transport error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
