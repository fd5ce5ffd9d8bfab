//! Stream capability record

use super::filters::{FilterDecision, RecordFilter, StatusFilter};
use crate::error::{Error, Result};
use crate::pagination::{MetaPaginationCursor, PageCursor};
use crate::schema::JsonSchema;
use crate::types::{field_as_string, JsonValue, Record, ReplicationMethod, RequestContext};
use std::fmt;
use std::sync::Arc;

/// Query parameter carrying the replication watermark
pub const DEFAULT_WATERMARK_PARAM: &str = "modifiedSince";

// ============================================================================
// Records Location
// ============================================================================

/// Where the records of a response live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordsLocation {
    /// JSONPath into the body, e.g. `$.data[*]`
    JsonPath(String),
    /// The body itself: each element of an array, or a single object
    WholeBody,
}

impl Default for RecordsLocation {
    fn default() -> Self {
        Self::JsonPath("$.data[*]".to_string())
    }
}

impl RecordsLocation {
    /// Extract the records of one response body
    ///
    /// Every record must be a JSON object.
    pub fn extract(&self, body: &JsonValue) -> Result<Vec<Record>> {
        let (label, records) = match self {
            Self::JsonPath(path) => (path.as_str(), extract_with_jsonpath(body, path)?),
            Self::WholeBody => {
                let records = match body {
                    JsonValue::Array(items) => items.clone(),
                    JsonValue::Null => vec![],
                    other => vec![other.clone()],
                };
                ("$", records)
            }
        };

        if let Some(bad) = records.iter().find(|r| !r.is_object()) {
            return Err(Error::RecordExtraction {
                path: label.to_string(),
                message: format!("expected an object, found {bad}"),
            });
        }
        Ok(records)
    }
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &JsonValue, path: &str) -> Result<Vec<Record>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath '{path}': {e}"),
    })?;

    match jp.find(value) {
        JsonValue::Array(arr) => Ok(arr),
        JsonValue::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}

// ============================================================================
// Child Context
// ============================================================================

/// How a parent record turns into the context of a child run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMapping {
    /// Key in the child's context (and path template)
    pub context_key: String,
    /// Field of the parent record providing the value
    pub record_field: String,
}

impl ContextMapping {
    /// Create a new mapping
    pub fn new(context_key: impl Into<String>, record_field: impl Into<String>) -> Self {
        Self {
            context_key: context_key.into(),
            record_field: record_field.into(),
        }
    }
}

// ============================================================================
// Stream Definition
// ============================================================================

/// Everything that distinguishes one resource from another
#[derive(Clone)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Path template, relative to the API base URL
    pub path: String,
    /// Primary key fields
    pub primary_keys: Vec<String>,
    /// Replication key; `Some` makes the stream incremental
    pub replication_key: Option<String>,
    /// Query parameter the watermark is sent under
    pub watermark_param: String,
    /// Where records live in a response
    pub records: RecordsLocation,
    /// Next-page derivation
    pub cursor: Arc<dyn PageCursor>,
    /// Fixed query parameters sent with every page
    pub query: Vec<(String, String)>,
    /// Record predicates, applied in order
    pub filters: Vec<Arc<dyn RecordFilter>>,
    /// Context derivation for child streams
    pub child_context: Option<ContextMapping>,
    /// Parent stream, for child streams
    pub parent: Option<String>,
    /// Declared record schema, handed to the sink untouched
    pub schema: Arc<JsonSchema>,
}

impl StreamDefinition {
    /// Create a full-table stream with defaults: key `id`, records under
    /// `$.data[*]`, paginated by `meta.pagination`
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            primary_keys: vec!["id".to_string()],
            replication_key: None,
            watermark_param: DEFAULT_WATERMARK_PARAM.to_string(),
            records: RecordsLocation::default(),
            cursor: Arc::new(MetaPaginationCursor::new()),
            query: Vec::new(),
            filters: Vec::new(),
            child_context: None,
            parent: None,
            schema: Arc::new(JsonSchema::new()),
        }
    }

    /// Set primary keys
    #[must_use]
    pub fn with_primary_keys(mut self, keys: &[&str]) -> Self {
        self.primary_keys = keys.iter().map(ToString::to_string).collect();
        self
    }

    /// Make the stream incremental on the given field
    #[must_use]
    pub fn incremental(mut self, replication_key: impl Into<String>) -> Self {
        self.replication_key = Some(replication_key.into());
        self
    }

    /// Set where records live
    #[must_use]
    pub fn with_records(mut self, records: RecordsLocation) -> Self {
        self.records = records;
        self
    }

    /// Set the page cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Arc<dyn PageCursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Add a fixed query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a record filter
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn RecordFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a status allow-list: sent as query parameters and checked per record
    #[must_use]
    pub fn with_status_filter(mut self, filter: StatusFilter) -> Self {
        self.query.extend(filter.query_pairs());
        self.filters.push(Arc::new(filter));
        self
    }

    /// Derive child contexts from parent records
    #[must_use]
    pub fn with_child_context(mut self, mapping: ContextMapping) -> Self {
        self.child_context = Some(mapping);
        self
    }

    /// Declare the parent stream
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the declared schema
    #[must_use]
    pub fn with_schema(mut self, schema: JsonSchema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    /// Replication method implied by the replication key
    pub fn replication_method(&self) -> ReplicationMethod {
        if self.replication_key.is_some() {
            ReplicationMethod::Incremental
        } else {
            ReplicationMethod::FullTable
        }
    }

    /// Run every filter; the first skip wins
    pub fn admit(&self, record: &Record) -> Result<FilterDecision> {
        for filter in &self.filters {
            if let FilterDecision::Skip(reason) = filter.apply(&self.name, record)? {
                return Ok(FilterDecision::Skip(reason));
            }
        }
        Ok(FilterDecision::Keep)
    }

    /// Context for child runs derived from one emitted record
    ///
    /// The mapped field is structurally required: a record without it is
    /// malformed.
    pub fn child_context(&self, record: &Record) -> Result<Option<RequestContext>> {
        let Some(mapping) = &self.child_context else {
            return Ok(None);
        };

        let value = field_as_string(record, &mapping.record_field)
            .ok_or_else(|| Error::missing_record_field(&self.name, &mapping.record_field))?;
        Ok(Some(RequestContext::new().with(&mapping.context_key, value)))
    }
}

impl fmt::Debug for StreamDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDefinition")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("primary_keys", &self.primary_keys)
            .field("replication_key", &self.replication_key)
            .field("records", &self.records)
            .field("query", &self.query)
            .field("filters", &self.filters)
            .field("child_context", &self.child_context)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
