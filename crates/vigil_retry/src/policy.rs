//! Backoff policy.

use rand::Rng;
use std::time::Duration;

/// Attempt budget and backoff curve for one retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts including the first (at least one is always made)
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Cap on the un-jittered delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Upper bound on the random fraction added to each delay
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// Same curve with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt budget, never below one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Un-jittered delay after failed attempt `attempt` (1-based):
    /// `min(max_delay, initial_delay * multiplier^(attempt - 1))`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0))
        } else {
            self.max_delay
        }
    }

    /// Delay with jitter applied, where `sample` is a uniform value in `[0, 1)`.
    ///
    /// Never exceeds [`max_total_delay`](Self::max_total_delay).
    pub fn delay_for(&self, attempt: u32, sample: f64) -> Duration {
        let jitter = self.jitter_factor.max(0.0) * sample.clamp(0.0, 1.0);
        self.base_delay(attempt).mul_f64(1.0 + jitter)
    }

    /// Delay with a freshly drawn jitter sample.
    pub fn sample_delay(&self, attempt: u32) -> Duration {
        let sample = rand::thread_rng().gen_range(0.0..1.0);
        self.delay_for(attempt, sample)
    }

    /// Largest delay this policy can produce.
    pub fn max_total_delay(&self) -> Duration {
        self.max_delay.mul_f64(1.0 + self.jitter_factor.max(0.0))
    }
}
