use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Retry policy for the optimistic-concurrency convergence loop.
///
/// `max_attempts` bounds compare-and-swap conflict retries only; transient
/// storage errors are retried in place regardless of this budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of conflict retries before giving up on an event.
    pub max_attempts: u32,
    /// Initial delay, in milliseconds, before the first retry.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries.
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier applied to the delay after each attempt.
    pub backoff_factor: f32,
}

impl RetryConfig {
    /// Validates the retry policy bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MaxAttemptsZero);
        }
        if self.backoff_factor < 1.0 {
            return Err(ValidationError::BackoffFactorBelowOne);
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ValidationError::DelayBoundsInverted);
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            backoff_factor: 2.0,
        }
    }
}
