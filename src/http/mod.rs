//! HTTP client module
//!
//! Provides the fetch-side HTTP session used by every source.
//!
//! # Features
//!
//! - **Automatic Retries**: One [`RetryPolicy`] with backoff and full jitter
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Sessions**: Cookie jar plus a one-time warm-up visit

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig, RetryPolicy};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
