//! Exponential backoff used when the event subscriber reconnects

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Fraction of the delay randomized in both directions (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Exponential backoff calculator with jitter
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(32) as i32;
        self.attempt = self.attempt.saturating_add(1);

        let base = self.config.initial_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let capped = base.min(self.config.max_delay_ms as f64);

        let delay = if self.config.jitter_factor > 0.0 {
            let spread = capped * self.config.jitter_factor;
            capped + rand::rng().random_range(-spread..=spread)
        } else {
            capped
        };

        Duration::from_millis(delay.max(1.0) as u64)
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> ExponentialBackoff {
        ExponentialBackoff::with_config(BackoffConfig {
            initial_delay_ms,
            max_delay_ms,
            multiplier,
            jitter_factor: 0.0,
        })
    }

    #[test]
    fn test_delays_grow_exponentially() {
        let mut backoff = no_jitter(100, 10_000, 2.0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let mut backoff = no_jitter(1_000, 5_000, 10.0);
        for _ in 0..5 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig {
            initial_delay_ms: 1_000,
            max_delay_ms: 1_000,
            multiplier: 1.0,
            jitter_factor: 0.1,
        });
        for _ in 0..20 {
            let delay = backoff.next_delay().as_millis();
            assert!((900..=1_100).contains(&delay));
        }
    }

    #[test]
    fn test_reset() {
        let mut backoff = no_jitter(100, 10_000, 2.0);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
