//! Backoff policy
//!
//! Decides how long to wait after a failed attempt and when to give up.
//!
//! Two layers cooperate:
//! - throttle handling for HTTP 429, driven by the `RateLimit-Type` and
//!   `RateLimit-Retry-After` response headers
//! - exponential backoff with full jitter between attempts, bounded by a
//!   maximum number of attempts

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rand::Rng;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tracing::warn;

/// Header naming which limiter rejected the request
pub const RATE_LIMIT_TYPE_HEADER: &str = "RateLimit-Type";

/// Header carrying the instant the limit resets
pub const RATE_LIMIT_RETRY_AFTER_HEADER: &str = "RateLimit-Retry-After";

/// `RateLimit-Type` value for the daily quota
pub const DAILY_LIMITER: &str = "Daily limiter";

/// Backoff configuration for one client
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum attempts per logical request, including the first
    pub max_attempts: u32,
    /// Base delay of the exponential backoff
    pub initial_delay: Duration,
    /// Cap on a single exponential delay
    pub max_delay: Duration,
    /// Randomize delays (full jitter)
    pub jitter: bool,
    /// Lower bound on a server-specified throttle wait
    pub throttle_floor: Duration,
    /// Wait used when a 429 carries no usable retry-after
    pub default_throttle_wait: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
            throttle_floor: Duration::from_secs(1),
            default_throttle_wait: Duration::from_secs(1),
        }
    }
}

/// Outcome of inspecting a 429 response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Daily quota exhausted, abort the run
    HardStop {
        /// Raw retry-after hint, for the operator
        retry_after: Option<String>,
    },
    /// Wait this long, then retry
    Wait(Duration),
}

impl BackoffPolicy {
    /// Create a policy with the given attempt budget and default delays
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Policy with fixed, jitter-free delays (useful for tests)
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            max_delay: delay,
            jitter: false,
            throttle_floor: delay,
            default_throttle_wait: delay,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30);
        let base = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay);

        if !self.jitter || base.is_zero() {
            return base;
        }

        let base_ms = base.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=base_ms))
    }

    /// Inspect the headers of a 429 response
    ///
    /// A daily-limiter response is always a hard stop, whatever its
    /// retry-after says. Otherwise wait until the advertised instant, at
    /// least `throttle_floor`; an unparseable hint waits the default.
    pub fn throttle_decision(&self, headers: &HeaderMap, now: DateTime<Utc>) -> ThrottleDecision {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        };

        let retry_after = header(RATE_LIMIT_RETRY_AFTER_HEADER);

        if header(RATE_LIMIT_TYPE_HEADER) == Some(DAILY_LIMITER) {
            return ThrottleDecision::HardStop {
                retry_after: retry_after.map(ToString::to_string),
            };
        }

        match retry_after.and_then(parse_retry_after) {
            Some(until) => {
                let remaining = (until - now).num_seconds().max(0) as u64;
                ThrottleDecision::Wait(Duration::from_secs(remaining).max(self.throttle_floor))
            }
            None => {
                warn!(
                    "Throttled without a usable {} header ({:?}), waiting {:?}",
                    RATE_LIMIT_RETRY_AFTER_HEADER, retry_after, self.default_throttle_wait
                );
                ThrottleDecision::Wait(self.default_throttle_wait)
            }
        }
    }

    /// Turn a 429 into either the hard-stop error or a wait
    pub fn on_throttle(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<Duration> {
        match self.throttle_decision(headers, now) {
            ThrottleDecision::HardStop { retry_after } => {
                Err(Error::DailyLimitExceeded { retry_after })
            }
            ThrottleDecision::Wait(wait) => Ok(wait),
        }
    }
}

/// Attempt bookkeeping for one logical request
///
/// Created fresh for every logical request, never reset between retries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made so far
    pub attempts: u32,
    /// Total time spent sleeping between attempts
    pub backoff_elapsed: Duration,
}

impl RetryState {
    /// Start tracking a new logical request
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of an attempt
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Record a backoff sleep
    pub fn add_backoff(&mut self, delay: Duration) {
        self.backoff_elapsed += delay;
    }

    /// Whether another attempt is allowed under the policy
    pub fn can_retry(&self, policy: &BackoffPolicy) -> bool {
        self.attempts < policy.max_attempts
    }
}

/// Parse a `RateLimit-Retry-After` value (`YYYY-MM-DD HH:mm:ss <zone>`)
///
/// The zone may be `UTC`, `GMT`, `Z` or a numeric offset (`+0200`, `+02:00`).
pub fn parse_retry_after(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (stamp, zone) = raw.rsplit_once(' ')?;

    if matches!(zone, "UTC" | "GMT" | "Z") {
        let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").ok()?;
        return Some(naive.and_utc());
    }

    ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S %:z"]
        .iter()
        .find_map(|fmt| DateTime::<FixedOffset>::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
