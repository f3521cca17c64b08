use serde::{Deserialize, Serialize};

use crate::shared::{RetryConfig, ValidationError};

/// Top-level configuration for a coordinator process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Convergence loop retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl CoordinatorConfig {
    /// Validates coordinator configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.retry.validate()
    }
}
