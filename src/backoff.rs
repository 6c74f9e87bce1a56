//! Per-resource error backoff with jitter
//!
//! The controller runtime retries a failed reconciliation after whatever
//! delay `error_policy` returns. Consecutive failures of the same resource
//! back off exponentially; a successful pass resets the count.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;

/// Bounds for error backoff
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound on any delay
    pub max_delay: Duration,
    /// Growth factor per consecutive failure
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Un-jittered delay after `failures` consecutive failures (1-based)
    pub fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Consecutive failure counters keyed by resource
#[derive(Debug, Default)]
pub struct ErrorBackoff {
    config: BackoffConfig,
    failures: DashMap<String, u32>,
}

impl ErrorBackoff {
    /// Create a tracker with the given bounds
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: DashMap::new(),
        }
    }

    /// Record a failure and return the jittered delay before the next attempt
    pub fn next_delay(&self, key: &str) -> Duration {
        let failures = {
            let mut entry = self.failures.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            *entry
        };

        // 0.5x to 1.5x, never above max_delay
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let base = self.config.base_delay(failures);
        Duration::from_secs_f64(
            (base.as_secs_f64() * jitter).min(self.config.max_delay.as_secs_f64()),
        )
    }

    /// Forget failures of a resource after a successful pass
    pub fn reset(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Consecutive failures recorded for a resource
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|f| *f).unwrap_or(0)
    }
}
