//! Authenticator implementation
//!
//! Applies the API key and contact headers to requests.

use crate::config::TapConfig;
use reqwest::RequestBuilder;

/// Header carrying the API token
pub const AUTH_HEADER: &str = "X-AUTH-TOKEN";

/// Header carrying the contact email
pub const EMAIL_HEADER: &str = "email";

/// Authenticator handles applying credentials to HTTP requests
#[derive(Clone)]
pub struct Authenticator {
    /// API token
    token: String,
    /// Contact email
    email: String,
}

impl Authenticator {
    /// Create an authenticator from a token and contact email
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: email.into(),
        }
    }

    /// Create an authenticator from the tap configuration
    pub fn from_config(config: &TapConfig) -> Self {
        Self::new(&config.auth_token, &config.email)
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTH_HEADER, self.token.as_str())
            .header(EMAIL_HEADER, self.email.as_str())
    }

    /// Contact email attached to requests
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("token", &"***")
            .field("email", &self.email)
            .finish()
    }
}
