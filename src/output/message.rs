//! Output messages

use crate::state::State;
use crate::types::{JsonValue, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// Messages emitted during a read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    /// Declares the shape of a stream's records
    Schema {
        /// Stream name
        stream: String,
        /// JSON schema of the records
        schema: JsonValue,
        /// Primary key fields
        key_properties: Vec<String>,
        /// Replication key, for incremental streams
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },

    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// Record data, passed through untouched
        record: Record,
        /// When the record was extracted
        time_extracted: DateTime<Utc>,
    },

    /// State checkpoint
    State {
        /// Complete state at this point of the run
        value: State,
    },
}

impl Message {
    /// Create a schema message
    pub fn schema(
        stream: impl Into<String>,
        schema: JsonValue,
        key_properties: Vec<String>,
        replication_key: Option<&str>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties: replication_key.map(ToString::to_string).into_iter().collect(),
        }
    }

    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(state: State) -> Self {
        Self::State { value: state }
    }

    /// Stream the message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }
}
