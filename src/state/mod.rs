//! State management module
//!
//! Carries the per-stream bookmark (last-seen replication-key value) from
//! one run to the next.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - the serialized `{"bookmarks": {...}}` document
//! - `StateManager` - shared, optionally file-backed access to it

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{Bookmark, State};
