//! Pagination types and traits

use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Identifies the page to request
///
/// Pages are 1-indexed. The first request of a run carries no token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageToken(u32);

impl PageToken {
    /// The first page
    pub const FIRST: Self = Self(1);

    /// Create a token for the given page number, clamped to at least 1
    pub fn new(page: u32) -> Self {
        Self(page.max(1))
    }

    /// Page number carried by the token
    pub fn page(self) -> u32 {
        self.0
    }

    /// Token for the following page
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Request this page next
    Continue(PageToken),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// The token to request next, if any
    pub fn token(self) -> Option<PageToken> {
        match self {
            Self::Continue(token) => Some(token),
            Self::Done => None,
        }
    }
}

/// The `meta.pagination` block of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaginationMeta {
    /// Page the response belongs to
    pub current_page: u32,
    /// Number of pages the server reports for the query
    pub total_pages: u32,
}

/// Derives the next page token from a response
pub trait PageCursor: Send + Sync {
    /// Inspect a response body and the token that produced it
    ///
    /// `previous` is `None` for the first request of a run.
    fn next(&self, body: &Value, previous: Option<PageToken>) -> Result<NextPage>;
}
