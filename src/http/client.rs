//! HTTP client with retry and rate limiting
//!
//! Provides the client every stream sends through. It handles:
//! - The process-wide rate limiter gate before every attempt
//! - Throttle (429) handling and the daily-limit hard stop
//! - Exponential backoff with jitter between attempts
//! - Response body parsing
//! - Error classification for retry decisions

use super::backoff::{BackoffPolicy, RetryState};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Authenticator;
use crate::config::TapConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Retry and throttle policy
    pub backoff: BackoffPolicy,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(300),
            backoff: BackoffPolicy::default(),
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("precoro-tap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Client config derived from the tap configuration
    pub fn from_tap_config(config: &TapConfig) -> Self {
        let mut builder = Self::builder()
            .base_url(&config.api_url)
            .timeout(config.request_timeout())
            .backoff(BackoffPolicy::new(config.max_retries))
            .rate_limit(RateLimiterConfig::new(config.min_request_interval()));

        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent);
        }

        builder.build()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max attempts per request
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.backoff.max_attempts = attempts.max(1);
        self
    }

    /// Set the backoff policy
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.config.backoff = policy;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
///
/// Query parameters are an ordered list so repeated keys such as
/// `status[]=1&status[]=2` survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Values of a query parameter, in insertion order
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// HTTP client with retry and rate limiting
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, authenticator: Authenticator) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(authenticator);
        Ok(client)
    }

    /// Create the authenticated client described by the tap configuration
    pub fn from_tap_config(config: &TapConfig) -> Result<Self> {
        Self::with_auth(
            HttpClientConfig::from_tap_config(config),
            Authenticator::from_config(config),
        )
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// GET a JSON document, retrying transient failures
    ///
    /// Every attempt passes the rate limiter first. Retriable failures are
    /// absorbed until the attempt budget runs out, then surface as
    /// `MaxRetriesExceeded`. The daily-limit hard stop and non-retriable
    /// statuses are returned immediately.
    pub async fn get_json(&self, url: &str, config: &RequestConfig) -> Result<Value> {
        let full_url = self.build_url(url);
        let policy = &self.config.backoff;
        let mut retry = RetryState::new();

        loop {
            let attempt = retry.begin_attempt();

            let error = match self.send_once(&full_url, config).await {
                Ok(body) => {
                    debug!("GET {full_url} succeeded on attempt {attempt}");
                    return Ok(body);
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            if !retry.can_retry(policy) {
                return Err(Error::MaxRetriesExceeded {
                    attempts: retry.attempts,
                    last_error: Box::new(error),
                });
            }

            let delay = policy.delay_for_attempt(attempt);
            warn!(
                "GET {full_url} failed ({error}), attempt {attempt}/{}, retrying in {delay:?}",
                policy.max_attempts
            );
            tokio::time::sleep(delay).await;
            retry.add_backoff(delay);
        }
    }

    /// One attempt: rate limit, send, classify
    async fn send_once(&self, url: &str, config: &RequestConfig) -> Result<Value> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.throttle().await;
        }

        let mut req = self.client.get(url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }
        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let wait = self
                .config
                .backoff
                .on_throttle(response.headers(), Utc::now())?;
            warn!("Throttled (429) on {url}, waiting {wait:?} before retrying");
            tokio::time::sleep(wait).await;
            return Err(Error::Throttled {
                wait_seconds: wait.as_secs(),
            });
        }

        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("Response from {url} is not valid JSON: {e}")))
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}
