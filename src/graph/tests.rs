//! Tests for the stream graph

use super::*;
use crate::http::{BackoffPolicy, HttpClientConfig};
use crate::output::MemorySink;
use crate::stream::{ContextMapping, RecordsLocation};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpClient {
    HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .backoff(BackoffPolicy::fixed(2, Duration::from_millis(5)))
            .no_rate_limit()
            .build(),
    )
    .unwrap()
}

fn single_page(records: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": records,
        "meta": {"pagination": {"current_page": 1, "total_pages": 1}}
    }))
}

fn invoices() -> StreamDefinition {
    StreamDefinition::new("invoices", "/invoices")
        .incremental("updateDate")
        .with_child_context(ContextMapping::new("invoice_id", "idn"))
}

fn invoice_details() -> StreamDefinition {
    StreamDefinition::new("invoices_details", "/invoices/{invoice_id}")
        .with_records(RecordsLocation::WholeBody)
        .with_parent("invoices")
}

fn taxes() -> StreamDefinition {
    StreamDefinition::new("taxes", "/taxes")
}

/// Record and state messages as compact labels, for order checks
fn trace(sink: &MemorySink) -> Vec<String> {
    sink.messages()
        .iter()
        .filter_map(|m| match m {
            Message::Record { stream, record, .. } => Some(format!("{stream}:{}", record["id"])),
            Message::State { .. } => Some("STATE".to_string()),
            Message::Schema { .. } => None,
        })
        .collect()
}

async fn mount_invoices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .respond_with(single_page(json!([
            {"id": 1, "idn": "A", "updateDate": "2024-05-01T00:00:00+00:00"},
            {"id": 2, "idn": "B", "updateDate": "2024-05-03T00:00:00+00:00"}
        ])))
        .mount(server)
        .await;
}

async fn mount_details(server: &MockServer) {
    for (idn, id) in [("A", 101), ("B", 102)] {
        Mock::given(method("GET"))
            .and(path(format!("/invoices/{idn}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "idn": idn})))
            .expect(1)
            .mount(server)
            .await;
    }
}

// ============================================================================
// Construction
// ============================================================================

#[tokio::test]
async fn test_structure() {
    let server = MockServer::start().await;
    let graph = StreamGraph::new(
        vec![taxes(), invoices(), invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    assert_eq!(graph.roots(), vec!["taxes", "invoices"]);
    assert_eq!(graph.children("invoices"), vec!["invoices_details"]);
    assert!(graph.children("taxes").is_empty());
    assert_eq!(graph.stream_names().len(), 3);
    assert!(graph.is_selected("invoices_details"));
}

#[tokio::test]
async fn test_parent_must_come_first() {
    let server = MockServer::start().await;
    let err = StreamGraph::new(
        vec![invoice_details(), invoices()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_parent_needs_context_mapping() {
    let server = MockServer::start().await;
    let parent = StreamDefinition::new("invoices", "/invoices");
    let err = StreamGraph::new(
        vec![parent, invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_duplicate_stream() {
    let server = MockServer::start().await;
    let err = StreamGraph::new(vec![taxes(), taxes()], client(&server), StateManager::in_memory())
        .unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_select_unknown_stream() {
    let server = MockServer::start().await;
    let err = StreamGraph::new(vec![taxes()], client(&server), StateManager::in_memory())
        .unwrap()
        .select(&["nope"])
        .unwrap_err();
    assert!(matches!(err, Error::StreamNotFound { ref stream } if stream == "nope"));
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_children_run_after_each_parent_record() {
    let server = MockServer::start().await;
    mount_invoices(&server).await;
    mount_details(&server).await;

    let graph = StreamGraph::new(
        vec![invoices(), invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(sink.schema_streams(), vec!["invoices", "invoices_details"]);
    assert_eq!(
        trace(&sink),
        vec![
            "invoices:1",
            "invoices_details:101",
            "invoices:2",
            "invoices_details:102",
            "STATE",
            "STATE"
        ]
    );
    assert_eq!(summary.stats("invoices_details").records, 2);
    assert_eq!(summary.stats("invoices_details").pages, 2);
    assert_eq!(summary.total_records(), 4);
}

#[tokio::test]
async fn test_bookmark_committed_after_run() {
    let server = MockServer::start().await;
    mount_invoices(&server).await;
    mount_details(&server).await;

    let state = StateManager::from_json(
        r#"{"bookmarks": {"invoices": {"replication_key": "updateDate", "replication_key_value": "2024-04-01T00:00:00+00:00"}}}"#,
    )
    .unwrap();
    let graph = StreamGraph::new(vec![invoices(), invoice_details()], client(&server), state)
        .unwrap()
        .with_start_date(Some("2024-01-01".to_string()));

    let mut sink = MemorySink::new();
    graph.run(&mut sink).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let listing = requests.iter().find(|r| r.url.path() == "/invoices").unwrap();
    assert!(listing
        .url
        .query_pairs()
        .any(|(k, v)| k == "modifiedSince" && v == "2024-04-01T00:00:00"));

    // children carry no watermark of their own
    let detail = requests.iter().find(|r| r.url.path() == "/invoices/A").unwrap();
    assert!(!detail.url.query_pairs().any(|(k, _)| k == "modifiedSince"));

    assert_eq!(
        graph.state().get_bookmark("invoices").await.as_deref(),
        Some("2024-05-03T00:00:00+00:00")
    );
    let last = sink.states().last().copied().unwrap();
    assert_eq!(
        last.replication_key_value("invoices"),
        Some("2024-05-03T00:00:00+00:00")
    );
}

#[tokio::test]
async fn test_selecting_child_only() {
    let server = MockServer::start().await;
    mount_invoices(&server).await;
    mount_details(&server).await;

    let graph = StreamGraph::new(
        vec![taxes(), invoices(), invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap()
    .select(&["invoices_details"])
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(sink.schema_streams(), vec!["invoices_details"]);
    assert!(sink.records("invoices").is_empty());
    assert_eq!(sink.records("invoices_details").len(), 2);
    // the unselected parent keeps no bookmark and taxes is never requested
    assert!(graph.state().get_bookmark("invoices").await.is_none());
    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/taxes"));
}

#[tokio::test]
async fn test_sibling_continues_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(single_page(json!([{"id": 7}])))
        .expect(1)
        .mount(&server)
        .await;

    let graph = StreamGraph::new(
        vec![taxes(), StreamDefinition::new("items", "/items")],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    assert!(!summary.is_success());
    assert!(!summary.aborted);
    assert_eq!(summary.first_failure().unwrap().stream, "taxes");
    assert_eq!(summary.completed, vec!["items".to_string()]);
    assert_eq!(sink.records("items").len(), 1);
}

#[tokio::test]
async fn test_daily_limit_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("RateLimit-Type", "Daily limiter")
                .insert_header("RateLimit-Retry-After", "2024-01-02 00:00:00 UTC"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(single_page(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let graph = StreamGraph::new(
        vec![taxes(), StreamDefinition::new("items", "/items")],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    assert!(summary.aborted);
    let failure = summary.first_failure().unwrap();
    assert!(failure.error.is_fatal_for_process());
    assert!(summary.completed.is_empty());
}

#[tokio::test]
async fn test_child_failure_fails_parent() {
    let server = MockServer::start().await;
    mount_invoices(&server).await;
    Mock::given(method("GET"))
        .and(path("/invoices/A"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 102})))
        .expect(0)
        .mount(&server)
        .await;

    let graph = StreamGraph::new(
        vec![invoices(), invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.stream, "invoices");
    assert!(matches!(
        failure.error,
        Error::Stream { ref stream, .. } if stream == "invoices_details"
    ));
    assert!(graph.state().get_bookmark("invoices").await.is_none());
    // only the final checkpoint, without a bookmark
    assert_eq!(sink.states().len(), 1);
    // the page fetched before the failure is still counted
    assert_eq!(summary.stats("invoices").pages, 1);
    assert_eq!(sink.records("invoices").len(), 1);
}

#[tokio::test]
async fn test_missing_child_key_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(query_param("status[]", "2"))
        .respond_with(single_page(json!([{"id": 1, "status": 2}])))
        .mount(&server)
        .await;

    let parent = invoices().with_status_filter(crate::stream::StatusFilter::new(vec![2]));
    let graph = StreamGraph::new(
        vec![parent, invoice_details()],
        client(&server),
        StateManager::in_memory(),
    )
    .unwrap();

    let mut sink = MemorySink::new();
    let summary = graph.run(&mut sink).await.unwrap();

    let failure = summary.first_failure().unwrap();
    assert!(matches!(
        failure.error,
        Error::Stream { ref source, .. } if matches!(**source, Error::MissingRecordField { .. })
    ));
    assert!(sink.records("invoices").is_empty());
}
