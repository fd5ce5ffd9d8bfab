//! Error types for the Precoro tap
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall into three groups:
//! - retriable transport failures, absorbed by the retry loop in `http`
//! - fatal failures for one resource run (retry exhaustion, malformed data)
//! - the daily quota hard stop, which aborts the whole process

use thiserror::Error;

/// The main error type for the tap
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Throttled by server (429), waited {wait_seconds}s")]
    Throttled { wait_seconds: u64 },

    #[error("Daily request limit reached, retry after {}", .retry_after.as_deref().unwrap_or("tomorrow"))]
    DailyLimitExceeded { retry_after: Option<String> },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Giving up after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        attempts: u32,
        last_error: Box<Error>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Record in stream '{stream}' is missing required field '{field}'")]
    MissingRecordField { stream: String, field: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Stream Errors
    // ============================================================================
    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    #[error("Stream '{stream}' failed: {source}")]
    Stream {
        stream: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a missing record field error
    pub fn missing_record_field(stream: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingRecordField {
            stream: stream.into(),
            field: field.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Wrap an error with the stream it aborted
    pub fn in_stream(self, stream: impl Into<String>) -> Self {
        match self {
            // already attributed to the innermost stream
            Self::Stream { .. } => self,
            other => Self::Stream {
                stream: stream.into(),
                source: Box::new(other),
            },
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_builder() && !e.is_decode(),
            Error::Throttled { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Whether this error must stop the whole run, not only the failing stream
    pub fn is_fatal_for_process(&self) -> bool {
        match self {
            Error::DailyLimitExceeded { .. } => true,
            Error::Stream { source, .. } => source.is_fatal_for_process(),
            _ => false,
        }
    }

    /// Short operator-facing classification of a fatal error
    pub fn reason(&self) -> &'static str {
        match self {
            Error::DailyLimitExceeded { .. } => "daily limit reached, wait and retry later",
            Error::MaxRetriesExceeded { .. } => "retries exhausted",
            Error::MissingRecordField { .. }
            | Error::RecordExtraction { .. }
            | Error::Decode { .. }
            | Error::JsonParse(_)
            | Error::JsonPath { .. } => "malformed data",
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. } => "invalid configuration",
            Error::Stream { source, .. } => source.reason(),
            _ => "request failed",
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for the tap
pub type Result<T> = std::result::Result<T, Error>;
