// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Precoro Tap
//!
//! Incremental, rate-limited extraction of Precoro procurement data as a
//! stream of SCHEMA, RECORD and STATE messages.
//!
//! ## Features
//!
//! - **Polite HTTP**: one request per second through a global limiter, with
//!   bounded retries and `RateLimit-Retry-After` aware throttling
//! - **Daily limit hard stop**: a daily-limiter 429 ends the run at once
//! - **Incremental replication**: `modifiedSince` from the later of the
//!   configured start date and the stored bookmark
//! - **Parent/child resources**: every invoice and expense fans out into its
//!   detail resource
//! - **Record filters**: status allow-lists and the invoice export condition
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use precoro_tap::catalog::precoro_streams;
//! use precoro_tap::graph::StreamGraph;
//! use precoro_tap::http::HttpClient;
//! use precoro_tap::output::JsonLinesSink;
//! use precoro_tap::state::StateManager;
//! use precoro_tap::{Result, TapConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let graph = StreamGraph::new(
//!         precoro_streams(&config)?,
//!         HttpClient::from_tap_config(&config)?,
//!         StateManager::from_file("state.json")?,
//!     )?
//!     .with_start_date(config.start_date.clone());
//!
//!     let summary = graph.run(&mut JsonLinesSink::stdout()).await?;
//!     println!("{} records", summary.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          StreamGraph                            │
//! │   roots in catalog order, children once per parent record       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Stream  │   HTTP    │   Paginate    │ Watermark │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Records  │ Rate Limit│ meta.         │ Bookmark  │ SCHEMA      │
//! │ Filters  │ Backoff   │ pagination    │ High-water│ RECORD      │
//! │ Context  │ Throttle  │               │ State     │ STATE       │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Credential headers
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page cursors
pub mod pagination;

/// Replication watermark
pub mod watermark;

/// State management and bookmarks
pub mod state;

/// Path template interpolation
pub mod template;

/// Static record schemas
pub mod schema;

/// Resource streams and record filters
pub mod stream;

/// Precoro resource catalog
pub mod catalog;

/// Parent/child stream composition
pub mod graph;

/// Output messages and sinks
pub mod output;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
