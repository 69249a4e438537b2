//! Capped exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP statuses worth another attempt.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: Duration::from_millis(200),
            max_backoff: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_factor: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry `n` (1-based): `min(factor * 2^(n-1), max_backoff)`.
    pub fn delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exp = (retry - 1).min(31);
        self.backoff_factor
            .checked_mul(1u32 << exp)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }
}
