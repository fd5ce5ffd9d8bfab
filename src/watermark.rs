//! Incremental replication watermark
//!
//! The lower bound sent as `modifiedSince` is the later of the configured
//! start date and the bookmark persisted by the previous run. It is
//! recomputed for every page request from those two inputs, so it never
//! moves inside a run.
//!
//! Separately, a high-water mark follows the replication-key values seen in
//! the current run. It starts at the loaded bookmark, only moves forward,
//! and becomes the bookmark persisted for the next run.

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

/// Wire format of timestamp query parameters: second precision, no offset
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a timestamp as found in configuration, state or records
///
/// Accepts RFC 3339, ISO 8601 with a compact offset, naive date-times
/// (taken as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }

    let naive = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })?;

    Some(naive.and_utc().fixed_offset())
}

/// Format a timestamp for a query parameter
///
/// The wall-clock time is kept in the timestamp's own offset, which is then
/// dropped.
pub fn format_wire(ts: &DateTime<FixedOffset>) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Later of two optional timestamps, whichever is present if only one is
fn later(
    a: Option<DateTime<FixedOffset>>,
    b: Option<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}

// ============================================================================
// High-Water Mark
// ============================================================================

/// Highest replication-key value seen, kept in its original text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighWaterMark {
    raw: String,
    at: DateTime<FixedOffset>,
}

impl HighWaterMark {
    /// Parse a replication-key value
    pub fn parse(raw: &str) -> Option<Self> {
        parse_timestamp(raw).map(|at| Self {
            raw: raw.trim().to_string(),
            at,
        })
    }

    /// The value as it appeared in the record or state
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed instant
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

// ============================================================================
// Replication Watermark
// ============================================================================

/// Watermark bookkeeping for one incremental stream run
#[derive(Debug, Clone, Default)]
pub struct ReplicationWatermark {
    config_start: Option<DateTime<FixedOffset>>,
    bookmark: Option<DateTime<FixedOffset>>,
    high_water: Option<HighWaterMark>,
}

impl ReplicationWatermark {
    /// Build the watermark from the configured start date and the loaded bookmark
    ///
    /// An unparseable start date is a configuration error; an unparseable
    /// bookmark is a state error.
    pub fn new(config_start: Option<&str>, bookmark: Option<&str>) -> Result<Self> {
        let config_start = config_start
            .map(|raw| {
                parse_timestamp(raw).ok_or_else(|| {
                    Error::invalid_value("start_date", format!("'{raw}' is not a timestamp"))
                })
            })
            .transpose()?;

        let high_water = bookmark
            .map(|raw| {
                HighWaterMark::parse(raw).ok_or_else(|| {
                    Error::state(format!("Bookmark '{raw}' is not a timestamp"))
                })
            })
            .transpose()?;

        Ok(Self {
            config_start,
            bookmark: high_water.as_ref().map(HighWaterMark::instant),
            high_water,
        })
    }

    /// The `modifiedSince` lower bound, if any
    pub fn effective_lower_bound(&self) -> Option<DateTime<FixedOffset>> {
        later(self.config_start, self.bookmark)
    }

    /// The lower bound formatted for the query string
    pub fn query_value(&self) -> Option<String> {
        self.effective_lower_bound().as_ref().map(format_wire)
    }

    /// Fold a record's replication-key value into the high-water mark
    ///
    /// Returns true when the mark advanced. Values that are missing or not
    /// timestamps leave the mark unchanged.
    pub fn observe(&mut self, value: Option<&Value>) -> bool {
        let Some(raw) = value.and_then(Value::as_str) else {
            return false;
        };
        let Some(candidate) = HighWaterMark::parse(raw) else {
            debug!("Ignoring replication key value '{raw}', not a timestamp");
            return false;
        };

        let advances = self
            .high_water
            .as_ref()
            .map_or(true, |current| candidate.at > current.at);
        if advances {
            self.high_water = Some(candidate);
        }
        advances
    }

    /// Highest value seen so far, starting from the loaded bookmark
    pub fn high_water_mark(&self) -> Option<&HighWaterMark> {
        self.high_water.as_ref()
    }
}

// ============================================================================
// Approval Date
// ============================================================================

/// Secondary lower bound on document approval date
///
/// Independent of the watermark: it only shapes the query and never feeds
/// the persisted bookmark. An invalid value is logged and ignored.
pub fn approval_lower_bound(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    match parse_timestamp(raw) {
        Some(ts) => Some(format_wire(&ts)),
        None => {
            warn!("Invalid approval date format: {raw:?}");
            None
        }
    }
}
