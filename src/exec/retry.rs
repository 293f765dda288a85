// src/exec/retry.rs

//! Retry ceiling and exponential backoff.

use std::time::Duration;

/// Default number of attempts per stage.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay after the first failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default cap for a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// How often a stage is attempted and how long to wait in between.
///
/// `max_retries` is the total number of attempts, so with the default of 3 a
/// stage runs at most three times and sleeps at most twice (1s, then 2s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// `max_retries` is clamped to at least one attempt.
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self::new(max_retries, self.base_delay, self.max_delay)
    }

    /// Delay to wait after the given number of failed attempts.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        backoff(failed_attempts, self.base_delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Exponential backoff: `base * 2^(failed_attempts - 1)`, capped at `max`.
///
/// `failed_attempts` is 1-based: the delay after the first failure is
/// `base`. Zero is treated like one.
pub fn backoff(failed_attempts: u32, base: Duration, max: Duration) -> Duration {
    let exponent = failed_attempts.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent).map_or(max, |delay| delay.min(max))
}
