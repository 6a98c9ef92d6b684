use std::time::Duration;

use tokio::time::Instant;

/// Capped exponential backoff for keyboard rediscovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Attempts before giving up. Zero disables rediscovery.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 20,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (0-based): `initial * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Whether the key source is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceHealth {
    Connected,
    Lost {
        /// Rediscovery attempts made so far.
        attempts: u32,
        next_attempt: Instant,
    },
    /// Retries exhausted; the controller only serves the clock.
    Abandoned,
}

impl DeviceHealth {
    /// State after the device was lost, or after a failed attempt.
    pub fn after_failure(attempts: u32, policy: &RetryPolicy, now: Instant) -> Self {
        if attempts >= policy.max_attempts {
            Self::Abandoned
        } else {
            Self::Lost {
                attempts,
                next_attempt: now + policy.delay_for(attempts),
            }
        }
    }
}
