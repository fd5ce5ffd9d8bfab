//! Tests for pagination module

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn page(current: u32, total: u32) -> serde_json::Value {
    json!({
        "data": [],
        "meta": {"pagination": {"current_page": current, "total_pages": total}}
    })
}

/// Drive the cursor against a server that honours the requested page
fn walk(total_pages: u32) -> Vec<Option<PageToken>> {
    let cursor = MetaPaginationCursor::new();
    let mut requested = vec![None];
    let mut token: Option<PageToken> = None;

    loop {
        let current = token.map_or(1, PageToken::page);
        match cursor.next(&page(current, total_pages), token).unwrap() {
            NextPage::Continue(next) => {
                assert!(requested.len() < 100, "cursor did not terminate");
                requested.push(Some(next));
                token = Some(next);
            }
            NextPage::Done => break,
        }
    }
    requested
}

// ============================================================================
// PageToken Tests
// ============================================================================

#[test]
fn test_page_token_basics() {
    assert_eq!(PageToken::FIRST.page(), 1);
    assert_eq!(PageToken::new(0), PageToken::FIRST);
    assert_eq!(PageToken::new(4).next().page(), 5);
    assert_eq!(PageToken::new(3).to_string(), "3");
}

#[test]
fn test_next_page_accessors() {
    let next = NextPage::Continue(PageToken::new(2));
    assert!(next.is_continue());
    assert_eq!(next.token(), Some(PageToken::new(2)));

    assert!(NextPage::Done.is_done());
    assert_eq!(NextPage::Done.token(), None);
}

// ============================================================================
// MetaPaginationCursor Tests
// ============================================================================

#[test_case(1, 1 ; "single page")]
#[test_case(2, 2 ; "two pages")]
#[test_case(5, 5 ; "five pages")]
fn test_cursor_yields_one_request_per_page(total_pages: u32, expected_requests: usize) {
    let requested = walk(total_pages);
    assert_eq!(requested.len(), expected_requests);

    let pages: Vec<u32> = requested
        .iter()
        .map(|t| t.map_or(1, PageToken::page))
        .collect();
    let expected: Vec<u32> = (1..=total_pages).collect();
    assert_eq!(pages, expected);
}

#[test]
fn test_zero_total_pages_terminates_immediately() {
    let cursor = MetaPaginationCursor::new();
    let next = cursor.next(&page(1, 0), None).unwrap();
    assert!(next.is_done());
}

#[test]
fn test_missing_meta_means_no_pagination() {
    let cursor = MetaPaginationCursor::new();
    let body = json!({"data": [{"id": 1}]});
    assert!(cursor.next(&body, None).unwrap().is_done());

    let body = json!([{"id": 1}, {"id": 2}]);
    assert!(cursor.next(&body, Some(PageToken::new(3))).unwrap().is_done());
}

#[test]
fn test_next_token_follows_previous() {
    let cursor = MetaPaginationCursor::new();
    let next = cursor.next(&page(3, 10), Some(PageToken::new(3))).unwrap();
    assert_eq!(next, NextPage::Continue(PageToken::new(4)));
}

#[test]
fn test_malformed_meta_is_decode_error() {
    let cursor = MetaPaginationCursor::new();

    let body = json!({"meta": {"total": 3}});
    assert!(matches!(cursor.next(&body, None), Err(Error::Decode { .. })));

    let body = json!({"meta": {"pagination": {"current_page": "one", "total_pages": 2}}});
    assert!(matches!(cursor.next(&body, None), Err(Error::Decode { .. })));
}

#[test]
fn test_no_pagination_always_done() {
    assert!(NoPagination.next(&page(1, 5), None).unwrap().is_done());
}
