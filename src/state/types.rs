//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs, in the
//! shape `{"bookmarks": {"<stream>": {"replication_key": ..., "replication_key_value": ...}}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Last-seen replication-key value for a stream
    pub fn replication_key_value(&self, stream: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.replication_key_value.as_deref()
    }

    /// Record the replication-key value reached by a stream
    pub fn set_replication_key_value(
        &mut self,
        stream: &str,
        replication_key: &str,
        value: impl Into<String>,
    ) {
        let bookmark = self.bookmarks.entry(stream.to_string()).or_default();
        bookmark.replication_key = Some(replication_key.to_string());
        bookmark.replication_key_value = Some(value.into());
    }
}

/// Bookmark of a single stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Name of the replication-key field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,

    /// Highest replication-key value synced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,
}
