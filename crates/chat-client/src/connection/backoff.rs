//! Reconnect backoff
//!
//! Exponential delay with symmetric jitter, capped at `max_ms`.

use chat_common::BackoffConfig;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Bounds of the pause before reconnecting after INVALID_SESSION
pub(crate) const INVALID_SESSION_DELAY_MS: RangeInclusive<u64> = 1_000..=5_000;

/// Backoff calculator for one shard
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.base_ms as f64 * 2f64.powi(self.attempt.min(32) as i32);
        let max = self.config.max_ms as f64;
        let capped = base.min(max);

        let jitter_range = capped * self.config.jitter;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        self.attempt = self.attempt.saturating_add(1);

        Duration::from_millis((capped + jitter).clamp(0.0, max) as u64)
    }

    /// Reset after a successful handshake
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Uniform random delay within `range_ms`
#[must_use]
pub fn random_delay(range_ms: RangeInclusive<u64>) -> Duration {
    if range_ms.is_empty() {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(range_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(base_ms: u64, max_ms: u64, jitter: f64) -> Backoff {
        Backoff::new(BackoffConfig {
            base_ms,
            max_ms,
            jitter,
        })
    }

    #[test]
    fn test_exponential_growth_capped() {
        let mut backoff = backoff(100, 1_000, 0.0);
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(backoff.attempt(), 6);
    }

    #[test]
    fn test_reset() {
        let mut backoff = backoff(100, 1_000, 0.0);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut jittered = backoff(1_000, 60_000, 0.25);
        for _ in 0..50 {
            jittered.reset();
            let delay = jittered.next_delay().as_millis();
            assert!((750..=1_250).contains(&delay), "delay {delay} out of range");
        }

        let mut capped = backoff(60_000, 60_000, 0.5);
        for _ in 0..20 {
            assert!(capped.next_delay() <= Duration::from_millis(60_000));
        }
    }

    #[test]
    fn test_many_attempts_do_not_overflow() {
        let mut backoff = backoff(1_000, 60_000, 0.0);
        for _ in 0..200 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_invalid_session_delay_range() {
        for _ in 0..20 {
            let delay = random_delay(INVALID_SESSION_DELAY_MS);
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(5));
        }
        assert_eq!(random_delay(0..=0), Duration::ZERO);
    }
}
