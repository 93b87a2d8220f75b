//! Bounded retry with exponential backoff for transient store failures.

use std::time::Duration;

use rand::Rng;

use crate::import_job::DEFAULT_MAX_ATTEMPTS;

/// Fraction of the computed delay used as the jitter window (±20%).
const JITTER_RATIO: f64 = 0.2;

/// Retry configuration for import jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Deliveries allowed before a job is forced to `Failed`.
    pub max_attempts: i32,
    /// Delay before the second delivery.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Spread delays randomly to avoid retry storms.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Backoff after delivery number `attempt` (1-based) failed:
    /// `base * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: i32) -> Duration {
        let exponent = attempt.saturating_sub(1).clamp(0, 30) as u32;
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }

    /// [`Self::backoff`] with jitter applied when enabled. Never exceeds
    /// `max_delay`.
    pub fn next_delay(&self, attempt: i32) -> Duration {
        let delay = self.backoff(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::rng().random_range((1.0 - JITTER_RATIO)..=(1.0 + JITTER_RATIO));
        // Scaling near `Duration::MAX` overflows; clamp instead.
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether another delivery is allowed after `attempt` deliveries.
    pub fn should_retry(&self, attempt: i32) -> bool {
        attempt < self.max_attempts
    }
}
