//! Record filters
//!
//! Filters are pure predicates over a single record: applying one twice to
//! the same record gives the same decision.

use crate::config::ExportCondition;
use crate::error::{Error, Result};
use crate::types::{field_as_string, JsonValue, Record};
use std::fmt;
use tracing::warn;

/// Query parameter of status allow-lists, repeated once per status
pub const STATUS_PARAM: &str = "status[]";

/// Record field holding the document custom fields
pub const CUSTOM_FIELDS_FIELD: &str = "dataDocumentCustomFields";

/// Outcome of a filter for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Emit the record
    Keep,
    /// Drop the record; the reason is logged
    Skip(String),
}

impl FilterDecision {
    /// Check if the record is kept
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Resource-specific record predicate
///
/// A skip is not an error. An error means the record lacks a field the
/// predicate cannot work without.
pub trait RecordFilter: Send + Sync + fmt::Debug {
    /// Decide whether a record of `stream` is emitted
    fn apply(&self, stream: &str, record: &Record) -> Result<FilterDecision>;
}

// ============================================================================
// Status Tables
// ============================================================================

/// Mapping from configured status names to API status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTable(&'static [(&'static str, i64)]);

/// Statuses of invoices and expenses
pub const DOCUMENT_STATUSES: StatusTable = StatusTable(&[
    ("open", 0),
    ("pending", 1),
    ("approved", 2),
    ("denied", 3),
    ("partly_paid", 4),
    ("paid", 5),
    ("awaiting_confirmation", 6),
    ("on_revise", 7),
    ("canceled", 8),
    ("pending_receipt", 9),
]);

/// Statuses of suppliers
pub const SUPPLIER_STATUSES: StatusTable =
    StatusTable(&[("pending", 1), ("approved", 2), ("rejected", 3)]);

impl StatusTable {
    /// Code for a status name
    pub fn code(&self, name: &str) -> Option<i64> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
    }

    /// All status names
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.0.iter().map(|(n, _)| *n)
    }
}

/// Turn a comma-separated list of status names into codes
///
/// Names are trimmed and must match a table entry exactly; unknown names are
/// dropped with a warning. Order is preserved.
pub fn resolve_statuses(table: StatusTable, raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            let code = table.code(name);
            if code.is_none() {
                warn!("Ignoring unknown status '{name}'");
            }
            code
        })
        .collect()
}

// ============================================================================
// Status Filter
// ============================================================================

/// Status allow-list
///
/// Sent to the server as repeated `status[]` parameters and re-checked on
/// each record. Records without a readable `status` are kept, since the
/// server-side filter already applied to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter {
    allowed: Vec<i64>,
}

impl StatusFilter {
    /// Create a filter allowing the given codes
    pub fn new(allowed: Vec<i64>) -> Self {
        Self { allowed }
    }

    /// Allowed status codes
    pub fn allowed(&self) -> &[i64] {
        &self.allowed
    }

    /// Query parameters carrying the allow-list
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.allowed
            .iter()
            .map(|code| (STATUS_PARAM.to_string(), code.to_string()))
            .collect()
    }

    fn record_status(record: &Record) -> Option<i64> {
        match record.get("status")? {
            JsonValue::Number(n) => n.as_i64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl RecordFilter for StatusFilter {
    fn apply(&self, _stream: &str, record: &Record) -> Result<FilterDecision> {
        match Self::record_status(record) {
            Some(status) if !self.allowed.contains(&status) => Ok(FilterDecision::Skip(format!(
                "status {status} is not in {:?}",
                self.allowed
            ))),
            _ => Ok(FilterDecision::Keep),
        }
    }
}

// ============================================================================
// Export Condition
// ============================================================================

/// Render a custom field value for comparison with the configured value
fn custom_field_value(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RecordFilter for ExportCondition {
    /// Keep a record only if its first custom field with the configured id
    /// carries the allowed value
    ///
    /// `dataDocumentCustomFields.data` must be present; a record without
    /// it cannot be evaluated and is malformed.
    fn apply(&self, stream: &str, record: &Record) -> Result<FilterDecision> {
        let custom_fields = record
            .get(CUSTOM_FIELDS_FIELD)
            .and_then(|f| f.get("data"))
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                Error::missing_record_field(stream, format!("{CUSTOM_FIELDS_FIELD}.data"))
            })?;

        let matching = custom_fields.iter().find(|field| {
            field
                .get("documentCustomField")
                .and_then(|f| f.get("id"))
                .and_then(JsonValue::as_i64)
                == Some(self.field_id)
        });

        let id = field_as_string(record, "id").unwrap_or_else(|| "?".to_string());
        let decision = match matching {
            None => FilterDecision::Skip(format!(
                "record {id} has no custom field {} for the export condition",
                self.field_id
            )),
            Some(field) => match custom_field_value(field.get("value")) {
                Some(value) if value == self.allowed_value => FilterDecision::Keep,
                value => FilterDecision::Skip(format!(
                    "record {id} didn't match the export condition: field {} is {:?}, expected {:?}",
                    self.field_id, value, self.allowed_value
                )),
            },
        };
        Ok(decision)
    }
}
