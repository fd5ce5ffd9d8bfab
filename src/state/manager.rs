//! State manager implementation
//!
//! Provides shared access to the run state and file persistence with
//! atomic writes.

use super::types::State;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// State manager for loading, updating and persisting state
#[derive(Debug)]
pub struct StateManager {
    /// File written on every update; empty for in-memory mode
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<State>>,
}

impl StateManager {
    /// Create an empty state manager persisting to the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(State::new())),
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(State::new())),
        }
    }

    /// Load state from a file without persisting back to it
    ///
    /// A missing file yields an empty state.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                Error::state(format!("Failed to read state file {}: {e}", path.display()))
            })?;
            parse_state(&contents)?
        } else {
            debug!("State file {} not found, starting empty", path.display());
            State::new()
        };

        Ok(Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Create a state manager from inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(parse_state(json)?)),
        })
    }

    /// Persist every update to `path` from now on
    #[must_use]
    pub fn persist_to(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Save state to a specific file path
    ///
    /// Writes a sibling temp file first, then renames it into place.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = self.to_json_pretty().await?;

        let path = path.as_ref();
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }

    /// Save current state to the configured file
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }
        self.save_to_file(&self.path).await
    }

    /// Snapshot of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Export state as JSON string
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Bookmark value for a stream
    pub async fn get_bookmark(&self, stream: &str) -> Option<String> {
        let state = self.state.read().await;
        state.replication_key_value(stream).map(ToString::to_string)
    }

    /// Set the bookmark value for a stream and persist it
    pub async fn set_bookmark(
        &self,
        stream: &str,
        replication_key: &str,
        value: impl Into<String>,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.set_replication_key_value(stream, replication_key, value);
        }

        self.save().await
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

fn parse_state(contents: &str) -> Result<State> {
    if contents.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}
