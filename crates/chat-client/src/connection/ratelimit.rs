//! Identify rate limiting shared by the shards of one manager

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// `max_concurrency` identifies per `spacing`, across all shards
pub struct IdentifyLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl IdentifyLimiter {
    /// A zero spacing disables limiting
    #[must_use]
    pub fn new(spacing: Duration, max_concurrency: u32) -> Self {
        let burst = NonZeroU32::new(max_concurrency).unwrap_or(NonZeroU32::MIN);
        let limiter = Quota::with_period(spacing / burst.get())
            .map(|quota| RateLimiter::direct(quota.allow_burst(burst)));

        Self { limiter }
    }

    #[must_use]
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait for an identify permit
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for IdentifyLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifyLimiter")
            .field("limited", &self.is_limited())
            .finish()
    }
}
