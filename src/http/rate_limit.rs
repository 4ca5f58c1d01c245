//! Request throttling
//!
//! NSE and Screener both block clients that hammer them, so every client
//! carries a governor token bucket. API clients get the configured quota;
//! the scraper session uses [`RateLimiterConfig::polite`].

use crate::config::RateLimitConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Token bucket quota
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    pub requests_per_second: u32,
    /// Requests allowed back to back before throttling starts
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RateLimiterConfig {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// One request per second, for scraped HTML pages
    pub fn polite() -> Self {
        Self::new(1, 1)
    }

    fn quota(&self) -> Quota {
        // Zero would disable the bucket entirely; treat it as the slowest rate
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Token bucket shared by every clone of a client
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            limiter: Arc::new(Governor::direct(config.quota())),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take a permit if one is free right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Take a permit, waiting for the bucket to refill; returns the time spent waiting
    pub async fn acquire(&self) -> Duration {
        if self.try_acquire() {
            return Duration::ZERO;
        }

        let started = Instant::now();
        self.limiter.until_ready().await;
        let waited = started.elapsed();
        tracing::debug!(
            waited_ms = waited.as_millis() as u64,
            rps = self.config.requests_per_second,
            "Request throttled"
        );
        waited
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
