//! Resubscription backoff for the change stream.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of consecutive resubscriptions. Reset after every
    /// successfully applied batch.
    pub max_retries: u32,

    /// Delay before the first resubscription (milliseconds)
    pub initial_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Maximum delay between resubscriptions (milliseconds)
    pub max_delay_ms: u64,

    /// Relative jitter, e.g. `0.4` spreads each delay over ±40 %.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10_000,
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            jitter: 0.4,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        let jitter = self.jitter.clamp(0.0, 1.0);
        let final_delay = if jitter > 0.0 {
            let factor = rand::thread_rng().gen_range(1.0 - jitter..=1.0 + jitter);
            (capped_delay * factor).min(self.max_delay_ms as f64)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay.max(0.0) as u64)
    }

    /// Upper bound of [`Self::delay_for_attempt`] ignoring jitter.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_until_capped() {
        let config = RetryConfig {
            jitter: 0.0,
            ..Default::default()
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(32));
        assert_eq!(config.delay_for_attempt(6), Duration::from_secs(60));
        assert_eq!(config.delay_for_attempt(9_999), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryConfig::default();
        for _ in 0..200 {
            let d = config.delay_for_attempt(0).as_millis();
            assert!((600..=1400).contains(&d), "delay {d}ms outside ±40%");
        }
        for _ in 0..200 {
            assert!(config.delay_for_attempt(20) <= config.max_delay());
        }
    }
}
