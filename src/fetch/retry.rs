//! Reusable retry policy with exponential backoff and jitter
//!
//! One policy object is shared by the fetcher and the persistence batch
//! writer rather than each keeping its own ad hoc loop.

use rand::Rng;
use std::time::Duration;

/// Retry policy: attempt count, exponential base delay, multiplicative jitter
///
/// The delay for retry `n` (zero-based) is `base * 2^n * (1 + j)` with `j`
/// drawn uniformly from `[0, jitter]`. With `jitter <= 0.5` the delay
/// sequence is non-decreasing across attempts even at the jitter extremes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base: Duration,
    jitter: f64,
}

impl RetryPolicy {
    /// Creates a policy with the default jitter factor of 0.5
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            base,
            jitter: 0.5,
        }
    }

    /// Overrides the jitter factor (useful for deterministic tests)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 0.5);
        self
    }

    /// Number of retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff delay before retry `attempt` (zero-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self
            .base
            .as_millis()
            .saturating_mul(1u128 << attempt.min(20)) as u64;
        let factor = if self.jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(0.0..=self.jitter)
        } else {
            1.0
        };
        Duration::from_millis((exponential as f64 * factor) as u64)
    }
}
