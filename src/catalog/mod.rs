//! Precoro resource catalog
//!
//! The static set of resources the tap knows about, with their record
//! schemas, and the serializable catalog printed by `discover`.

mod schemas;
mod streams;

pub use streams::{precoro_streams, APPROVAL_DATE_PARAM, DEFAULT_DOCUMENT_STATUS};

use crate::stream::StreamDefinition;
use crate::types::{JsonValue, ReplicationMethod};
use serde::{Deserialize, Serialize};

/// Catalog of available streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Available streams, parents before their children
    pub streams: Vec<CatalogEntry>,
}

/// Description of one stream in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream identifier
    pub tap_stream_id: String,

    /// Stream name
    pub stream: String,

    /// JSON schema of the records
    pub schema: JsonValue,

    /// Primary key fields
    pub key_properties: Vec<String>,

    /// Replication key, for incremental streams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Replication method
    pub replication_method: ReplicationMethod,

    /// Parent stream, for child streams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_stream: Option<String>,
}

impl From<&StreamDefinition> for CatalogEntry {
    fn from(definition: &StreamDefinition) -> Self {
        Self {
            tap_stream_id: definition.name.clone(),
            stream: definition.name.clone(),
            schema: definition.schema.to_json(),
            key_properties: definition.primary_keys.clone(),
            replication_key: definition.replication_key.clone(),
            replication_method: definition.replication_method(),
            parent_stream: definition.parent.clone(),
        }
    }
}

impl Catalog {
    /// Build the catalog of the given stream definitions
    pub fn from_definitions(definitions: &[StreamDefinition]) -> Self {
        Self {
            streams: definitions.iter().map(CatalogEntry::from).collect(),
        }
    }

    /// Find a stream by name
    pub fn get(&self, stream: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|entry| entry.stream == stream)
    }

    /// Stream names, in catalog order
    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.iter().map(|entry| entry.stream.as_str()).collect()
    }
}
