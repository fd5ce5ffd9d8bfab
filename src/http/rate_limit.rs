//! Rate limiting implementation
//!
//! The upstream API enforces a global quota of one request per second, so
//! the limiter is a single-slot gate shared by every stream of a run: no
//! burst allowance, and every send after the first waits out the interval
//! measured from the previous permitted send. Uses the governor crate.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Minimum spacing between two permitted sends
    pub min_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
        }
    }
}

impl RateLimiterConfig {
    /// Create a rate limiter config with the given spacing
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }
}

/// Single-slot rate limiter
///
/// Clones share the same gate, so handing a clone to every stream keeps the
/// process-wide ceiling intact.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::with_period(config.min_interval)
            .unwrap_or_else(|| {
                warn!("Zero request interval, falling back to one request per second");
                Quota::per_second(NonZeroU32::MIN)
            })
            .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            min_interval: config.min_interval,
        }
    }

    /// Wait until a request may be sent
    ///
    /// Returns immediately after an idle period longer than the interval.
    pub async fn throttle(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire send permission, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Configured spacing between sends
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}
