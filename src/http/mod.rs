//! HTTP client module
//!
//! Provides the HTTP client with retry, rate limiting, and backoff.
//!
//! # Features
//!
//! - **Rate Limiting**: single-slot, process-wide gate using governor
//! - **Throttle Handling**: `RateLimit-Type` / `RateLimit-Retry-After` aware
//! - **Backoff**: exponential with full jitter, bounded attempts
//! - **Authentication**: integration with the auth module

mod backoff;
mod client;
mod rate_limit;

pub use backoff::{
    parse_retry_after, BackoffPolicy, RetryState, ThrottleDecision, DAILY_LIMITER,
    RATE_LIMIT_RETRY_AFTER_HEADER, RATE_LIMIT_TYPE_HEADER,
};
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
