use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The convergence loop needs at least one retry attempt.
    #[error("`retry.max_attempts` cannot be zero")]
    MaxAttemptsZero,
    /// The backoff multiplier must not shrink delays.
    #[error("`retry.backoff_factor` must be at least 1.0")]
    BackoffFactorBelowOne,
    /// The delay bounds must be ordered.
    #[error("`retry.max_delay_ms` cannot be below `retry.initial_delay_ms`")]
    DelayBoundsInverted,
}
