//! Tap configuration
//!
//! The configuration object supplies the materialized credential, contact
//! headers, the API base URL and the per-resource filter options. It is
//! loaded from a JSON or YAML file, or from an inline JSON string.

use crate::error::{Error, Result};
use crate::types::OptionStringExt;
use crate::watermark::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Production API host
pub const DEFAULT_API_URL: &str = "https://api.precoro.com";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// API token sent as `X-AUTH-TOKEN`
    #[serde(default)]
    pub auth_token: String,

    /// Contact email sent as the `email` header
    #[serde(default)]
    pub email: String,

    /// Optional `User-Agent` header value
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Base URL for API requests
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Earliest modification date to replicate
    #[serde(default)]
    pub start_date: Option<String>,

    /// Lower bound on document approval date
    #[serde(default)]
    pub approval_date: Option<String>,

    /// Comma-separated document status names (invoices, expenses)
    #[serde(default)]
    pub statuses: Option<String>,

    /// Fetch documents in every status
    #[serde(default)]
    pub all_invoices: bool,

    /// Comma-separated supplier status names
    #[serde(default)]
    pub supplier_status: Option<String>,

    /// Export options
    #[serde(rename = "exportOptions", default)]
    pub export_options: ExportOptions,

    /// Maximum attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Minimum spacing between two requests, in milliseconds
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

/// Export options block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Only export invoices whose custom field matches this condition
    #[serde(default)]
    pub export_condition: Option<ExportConditionConfig>,
}

/// Raw export condition as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConditionConfig {
    /// Custom field id (integer, or a string of digits)
    pub id: serde_json::Value,

    /// Allowed value of the custom field
    #[serde(default)]
    pub value: serde_json::Value,
}

impl TapConfig {
    /// Create a config with just the credential, everything else defaulted
    pub fn new(auth_token: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            email: email.into(),
            user_agent: None,
            api_url: default_api_url(),
            start_date: None,
            approval_date: None,
            statuses: None,
            all_invoices: false,
            supplier_status: None,
            export_options: ExportOptions::default(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }

    /// Load config from a file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let config: Self = if is_yaml {
            serde_yaml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        config.validated()
    }

    /// Load config from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Validate required fields and normalize values
    pub fn validated(mut self) -> Result<Self> {
        if self.auth_token.trim().is_empty() {
            return Err(Error::missing_field("auth_token"));
        }
        if self.email.trim().is_empty() {
            return Err(Error::missing_field("email"));
        }
        if self.max_retries == 0 {
            return Err(Error::invalid_value("max_retries", "must be at least 1"));
        }
        if self.min_request_interval_ms == 0 {
            return Err(Error::invalid_value(
                "min_request_interval_ms",
                "must be at least 1",
            ));
        }

        self.api_url = normalize_base_url(&self.api_url)?;
        self.user_agent = self.user_agent.none_if_empty();
        self.start_date = self.start_date.none_if_empty();
        self.approval_date = self.approval_date.none_if_empty();
        self.statuses = self.statuses.none_if_empty();
        self.supplier_status = self.supplier_status.none_if_empty();

        if let Some(start) = &self.start_date {
            if parse_timestamp(start).is_none() {
                return Err(Error::invalid_value(
                    "start_date",
                    format!("'{start}' is not a timestamp"),
                ));
            }
        }

        // surface a bad export condition at load time rather than mid-run
        self.export_condition()?;

        Ok(self)
    }

    /// Parsed export condition, if one is configured
    pub fn export_condition(&self) -> Result<Option<ExportCondition>> {
        self.export_options
            .export_condition
            .as_ref()
            .map(ExportCondition::from_config)
            .transpose()
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Minimum spacing between requests
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

// ============================================================================
// Export Condition
// ============================================================================

/// Validated export condition: custom field `field_id` must equal `allowed_value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCondition {
    /// Document custom field id
    pub field_id: i64,
    /// Value the field must have, compared as a string
    pub allowed_value: String,
}

impl ExportCondition {
    /// Create a new export condition
    pub fn new(field_id: i64, allowed_value: impl Into<String>) -> Self {
        Self {
            field_id,
            allowed_value: allowed_value.into(),
        }
    }

    fn from_config(raw: &ExportConditionConfig) -> Result<Self> {
        let field_id = match &raw.id {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::invalid_value(
                "exportOptions.export_condition.id",
                format!("'{}' is not an integer, please verify the id is correct", raw.id),
            )
        })?;

        let allowed_value = match &raw.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => "None".to_string(),
            other => other.to_string(),
        };

        Ok(Self {
            field_id,
            allowed_value,
        })
    }
}

// ============================================================================
// URL Normalization
// ============================================================================

/// Normalize a base URL so it always carries an explicit `https://` scheme
///
/// Hosts given without a scheme get `https://`; plain `http://` is upgraded.
/// Trailing slashes are removed.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_API_URL.to_string());
    }

    let with_scheme = if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("https://{rest}")
    } else if trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    // reject anything url cannot parse as a host
    url::Url::parse(&with_scheme)?;
    Ok(with_scheme)
}
