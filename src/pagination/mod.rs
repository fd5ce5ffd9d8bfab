//! Pagination module
//!
//! Page-number pagination driven by the `meta.pagination` block of each
//! response.
//!
//! # Overview
//!
//! A [`PageCursor`] looks at one response body and the token that produced
//! it and decides which page to request next, or that the resource is
//! exhausted. The cursor holds no state of its own: the page token is a
//! loop-local value threaded through the stream's paging loop.

mod cursors;
mod types;

pub use cursors::{MetaPaginationCursor, NoPagination};
pub use types::{NextPage, PageCursor, PageToken, PaginationMeta};

#[cfg(test)]
mod tests;
