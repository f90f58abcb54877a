//! Retry with exponential backoff for engine calls

use std::time::{Duration, SystemTime};

/// Retry policy for an engine call
///
/// Controls how many times a failed call is retried and how long to wait
/// between attempts using exponential backoff. The default performs no
/// retries at all; per-engine policies are set in the configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts beyond the first call
    pub max_retries: u32,
    /// Base delay between retries (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts this policy allows
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Compute the delay before the next retry attempt.
///
/// The delay follows exponential backoff:
/// `min(base_delay * 2^attempt + jitter, max_delay)`.
///
/// Jitter is 0-25% of the computed delay, derived from the subsecond nanos
/// of the system clock.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    // Derive a simple jitter from subsecond nanos of the system clock
    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    // Scale to 0-25% of the base delay
    let jitter_fraction = f64::from(jitter_nanos % 250) / 1000.0;
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay)
}
