// src/services/retry.rs

//! Linear retry schedule for gateway deliveries.

use std::time::Duration;

use crate::models::NotifierConfig;

/// Linear backoff: attempt `k` (1-based) waits `(k - 1) * unit` first.
///
/// No jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay added per additional attempt.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_unit())
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt.saturating_sub(1))
    }

    /// Whether another attempt may follow the given one.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NotifierConfig::default())
    }
}
