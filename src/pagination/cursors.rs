//! Page cursor implementations

use super::types::{NextPage, PageCursor, PageToken, PaginationMeta};
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::debug;

// ============================================================================
// Meta Pagination
// ============================================================================

/// Follows `meta.pagination.{current_page,total_pages}`
///
/// A body without a `meta` object has no pagination concept and ends the
/// run after one page. A `meta` object whose pagination block cannot be read
/// is a malformed response.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaPaginationCursor;

impl MetaPaginationCursor {
    /// Create a new cursor
    pub fn new() -> Self {
        Self
    }

    fn pagination(body: &Value) -> Result<Option<PaginationMeta>> {
        let Some(meta) = body.get("meta") else {
            return Ok(None);
        };

        let pagination = meta
            .get("pagination")
            .ok_or_else(|| Error::decode("Response has `meta` but no `meta.pagination` block"))?;

        serde_json::from_value(pagination.clone())
            .map(Some)
            .map_err(|e| Error::decode(format!("Invalid `meta.pagination` block: {e}")))
    }
}

impl PageCursor for MetaPaginationCursor {
    fn next(&self, body: &Value, previous: Option<PageToken>) -> Result<NextPage> {
        let Some(meta) = Self::pagination(body)? else {
            return Ok(NextPage::Done);
        };

        // total_pages == 0 and a server overshooting its own total both stop here
        if meta.current_page >= meta.total_pages {
            debug!(
                "Last page reached ({}/{})",
                meta.current_page, meta.total_pages
            );
            return Ok(NextPage::Done);
        }

        let next = previous.unwrap_or(PageToken::FIRST).next();
        Ok(NextPage::Continue(next))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// Single-page resources
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPagination;

impl PageCursor for NoPagination {
    fn next(&self, _body: &Value, _previous: Option<PageToken>) -> Result<NextPage> {
        Ok(NextPage::Done)
    }
}
