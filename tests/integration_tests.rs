//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → catalog → stream graph → messages

use precoro_tap::auth::Authenticator;
use precoro_tap::catalog::{precoro_streams, Catalog};
use precoro_tap::config::TapConfig;
use precoro_tap::graph::{RunSummary, StreamGraph};
use precoro_tap::http::{BackoffPolicy, HttpClient, HttpClientConfig, RateLimiterConfig};
use precoro_tap::output::{JsonLinesSink, MemorySink, Message};
use precoro_tap::state::StateManager;
use precoro_tap::Error;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn tap_config(server: &MockServer) -> TapConfig {
    let mut config = TapConfig::new("secret-token", "ops@example.com");
    config.api_url = server.uri();
    config
}

fn client(config: &TapConfig, rate_limit: Option<Duration>) -> HttpClient {
    let mut builder = HttpClientConfig::builder()
        .base_url(&config.api_url)
        .backoff(BackoffPolicy::fixed(3, Duration::from_millis(20)));
    builder = match rate_limit {
        Some(interval) => builder.rate_limit(RateLimiterConfig::new(interval)),
        None => builder.no_rate_limit(),
    };
    HttpClient::with_auth(builder.build(), Authenticator::from_config(config)).unwrap()
}

fn page(records: Value, current: u32, total: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": records,
        "meta": {"pagination": {"current_page": current, "total_pages": total}}
    }))
}

async fn read(
    config: &TapConfig,
    state: StateManager,
    streams: &[&str],
    sink: &mut MemorySink,
) -> (StreamGraph, RunSummary) {
    let graph = StreamGraph::new(precoro_streams(config).unwrap(), client(config, None), state)
        .unwrap()
        .with_start_date(config.start_date.clone())
        .select(streams)
        .unwrap();
    let summary = graph.run(sink).await.unwrap();
    (graph, summary)
}

fn ids(records: &[&Value]) -> Vec<i64> {
    records.iter().filter_map(|r| r["id"].as_i64()).collect()
}

// ============================================================================
// Listing Resources
// ============================================================================

#[tokio::test]
async fn test_two_page_invoices_keep_approved_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(header("X-AUTH-TOKEN", "secret-token"))
        .and(header("email", "ops@example.com"))
        .and(query_param("status[]", "2"))
        .and(query_param("page", "2"))
        .respond_with(page(json!([{"id": 2, "idn": "B", "status": 3}]), 2, 2))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .and(header("X-AUTH-TOKEN", "secret-token"))
        .and(query_param("status[]", "2"))
        .respond_with(page(json!([{"id": 1, "idn": "A", "status": 2}]), 1, 2))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let config = tap_config(&server);
    let mut sink = MemorySink::new();
    let (_, summary) = read(&config, StateManager::in_memory(), &["invoices"], &mut sink).await;

    assert!(summary.is_success());
    assert_eq!(ids(&sink.records("invoices")), vec![1]);
    assert_eq!(summary.stats("invoices").pages, 2);
    assert_eq!(summary.stats("invoices").skipped, 1);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "page"));
}

#[tokio::test]
async fn test_full_table_taxes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(page(json!([{"id": 1, "name": "VAT", "percent": 20}]), 1, 1))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = tap_config(&server);
    config.start_date = Some("2024-01-01T00:00:00Z".to_string());
    let mut sink = MemorySink::new();
    let (graph, _) = read(&config, StateManager::in_memory(), &["taxes"], &mut sink).await;

    assert_eq!(sink.records("taxes").len(), 1);
    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query_pairs().any(|(k, _)| k == "modifiedSince"));
    assert!(graph.state().get_bookmark("taxes").await.is_none());
}

// ============================================================================
// Parent / Child
// ============================================================================

#[tokio::test]
async fn test_expenses_fan_out_to_details() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/expenses"))
        .respond_with(page(
            json!([
                {"id": 1, "idn": "EXP-1", "status": 2, "updateDate": "2024-06-01T09:00:00+00:00"},
                {"id": 2, "idn": "EXP-2", "status": 2, "updateDate": "2024-06-02T09:00:00+00:00"}
            ]),
            1,
            1,
        ))
        .mount(&server)
        .await;
    for (idn, id) in [("EXP-1", 11), ("EXP-2", 12)] {
        Mock::given(method("GET"))
            .and(path(format!("/expenses/{idn}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": id, "idn": idn})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = tap_config(&server);
    let mut sink = MemorySink::new();
    let (_, summary) = read(
        &config,
        StateManager::in_memory(),
        &["expenses", "expenses_details"],
        &mut sink,
    )
    .await;

    assert!(summary.is_success());
    assert_eq!(ids(&sink.records("expenses")), vec![1, 2]);
    assert_eq!(ids(&sink.records("expenses_details")), vec![11, 12]);
}

#[tokio::test]
async fn test_export_condition_gates_invoices_and_their_details() {
    let server = MockServer::start().await;

    let custom_fields = |value: &str| {
        json!({"data": [{"documentCustomField": {"id": 12}, "value": value}]})
    };
    Mock::given(method("GET"))
        .and(path("/invoices"))
        .respond_with(page(
            json!([
                {"id": 1, "idn": "A", "status": 2, "dataDocumentCustomFields": custom_fields("Yes")},
                {"id": 2, "idn": "B", "status": 2, "dataDocumentCustomFields": custom_fields("No")}
            ]),
            1,
            1,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 101, "idn": "A"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 102, "idn": "B"})))
        .expect(0)
        .mount(&server)
        .await;

    let config = TapConfig::from_json(
        r#"{"auth_token": "secret-token", "email": "ops@example.com",
            "exportOptions": {"export_condition": {"id": "12", "value": "Yes"}}}"#,
    )
    .unwrap();
    let config = TapConfig {
        api_url: server.uri(),
        ..config
    };

    let mut sink = MemorySink::new();
    let (_, summary) = read(
        &config,
        StateManager::in_memory(),
        &["invoices", "invoices_details"],
        &mut sink,
    )
    .await;

    assert!(summary.is_success());
    assert_eq!(ids(&sink.records("invoices")), vec![1]);
    assert_eq!(ids(&sink.records("invoices_details")), vec![101]);
    assert_eq!(summary.stats("invoices").skipped, 1);
}

// ============================================================================
// Incremental Replication
// ============================================================================

#[tokio::test]
async fn test_bookmark_round_trip_through_state_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("modifiedSince", "2024-03-01T12:00:00"))
        .respond_with(page(
            json!([
                {"id": 1, "updateDate": "2024-03-02T08:00:00+00:00"},
                {"id": 2, "updateDate": "2024-03-04T08:00:00+00:00"}
            ]),
            1,
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let state_in = dir.path().join("state.json");
    let state_out = dir.path().join("state-out.json");
    std::fs::write(
        &state_in,
        r#"{"bookmarks": {"items": {"replication_key": "updateDate", "replication_key_value": "2024-03-01T12:00:00+00:00"}}}"#,
    )
    .unwrap();

    let mut config = tap_config(&server);
    config.start_date = Some("2024-01-01".to_string());
    let state = StateManager::from_file(&state_in).unwrap().persist_to(&state_out);

    let mut sink = MemorySink::new();
    let (_, summary) = read(&config, state, &["items"], &mut sink).await;
    assert!(summary.is_success());

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&state_out).unwrap()).unwrap();
    assert_eq!(
        written["bookmarks"]["items"],
        json!({"replication_key": "updateDate", "replication_key_value": "2024-03-04T08:00:00+00:00"})
    );

    let last_state = sink.states().last().copied().unwrap();
    assert_eq!(
        last_state.replication_key_value("items"),
        Some("2024-03-04T08:00:00+00:00")
    );
}

#[tokio::test]
async fn test_json_lines_output() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/suppliers"))
        .respond_with(page(
            json!([{"id": 5, "name": "Acme", "updateDate": "2024-02-02T00:00:00+00:00"}]),
            1,
            1,
        ))
        .mount(&server)
        .await;

    let config = tap_config(&server);
    let graph = StreamGraph::new(
        precoro_streams(&config).unwrap(),
        client(&config, None),
        StateManager::in_memory(),
    )
    .unwrap()
    .select(&["suppliers"])
    .unwrap();

    let mut sink = JsonLinesSink::new(Vec::new());
    graph.run(&mut sink).await.unwrap();
    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["SCHEMA", "RECORD", "STATE", "STATE"]);
    assert_eq!(lines[0]["stream"], "suppliers");
    assert_eq!(lines[0]["key_properties"], json!(["id"]));
    assert_eq!(lines[0]["bookmark_properties"], json!(["updateDate"]));
    assert_eq!(lines[1]["record"]["name"], "Acme");
    assert_eq!(
        lines[3]["value"]["bookmarks"]["suppliers"]["replication_key_value"],
        "2024-02-02T00:00:00+00:00"
    );
}

// ============================================================================
// Throttling
// ============================================================================

#[tokio::test]
async fn test_throttled_request_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("RateLimit-Type", "Minute limiter")
                .insert_header("RateLimit-Retry-After", "2000-01-01 00:00:00 UTC"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(page(json!([{"id": 1}]), 1, 1))
        .mount(&server)
        .await;

    let config = tap_config(&server);
    let mut sink = MemorySink::new();
    let (_, summary) = read(&config, StateManager::in_memory(), &["taxes"], &mut sink).await;

    assert!(summary.is_success());
    assert_eq!(sink.records("taxes").len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_daily_limit_stops_everything() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/taxes"))
        .respond_with(page(json!([{"id": 1}]), 1, 1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices"))
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
        .respond_with(page(json!([]), 1, 1))
        .expect(0)
        .mount(&server)
        .await;

    let config = tap_config(&server);
    let mut sink = MemorySink::new();
    let (_, summary) = read(&config, StateManager::in_memory(), &[], &mut sink).await;

    assert!(summary.aborted);
    assert_eq!(summary.completed, vec!["taxes".to_string()]);
    let failure = summary.first_failure().unwrap();
    assert_eq!(failure.stream, "invoices");
    assert!(matches!(
        failure.error,
        Error::Stream { ref source, .. }
            if matches!(**source, Error::DailyLimitExceeded { ref retry_after }
                if retry_after.as_deref() == Some("2024-01-02 00:00:00 UTC"))
    ));
    assert_eq!(failure.error.reason(), "daily limit reached, wait and retry later");
}

#[tokio::test]
async fn test_parent_and_children_share_the_rate_limiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/invoices"))
        .respond_with(page(
            json!([{"id": 1, "idn": "A", "status": 2}, {"id": 2, "idn": "B", "status": 2}]),
            1,
            1,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 101})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/invoices/B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 102})))
        .mount(&server)
        .await;

    let config = tap_config(&server);
    let graph = StreamGraph::new(
        precoro_streams(&config).unwrap(),
        client(&config, Some(Duration::from_millis(150))),
        StateManager::in_memory(),
    )
    .unwrap()
    .select(&["invoices_details"])
    .unwrap();

    let started = Instant::now();
    let mut sink = MemorySink::new();
    graph.run(&mut sink).await.unwrap();

    // three requests, two enforced gaps
    assert!(started.elapsed() >= Duration::from_millis(295));
    assert_eq!(sink.records("invoices_details").len(), 2);
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_discover_catalog() {
    let config = TapConfig::new("t", "e@example.com");
    let catalog = Catalog::from_definitions(&precoro_streams(&config).unwrap());
    let json = serde_json::to_value(&catalog).unwrap();

    let streams = json["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 7);
    assert_eq!(streams[1]["tap_stream_id"], "invoices");
    assert_eq!(streams[1]["replication_method"], "INCREMENTAL");
    assert_eq!(streams[2]["parent_stream"], "invoices");
    assert_eq!(streams[0]["replication_method"], "FULL_TABLE");
    assert!(streams[0].get("replication_key").is_none());
}

#[test]
fn test_message_type_tags() {
    let msg = Message::record("taxes", json!({"id": 1}));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "RECORD");
    assert_eq!(json["stream"], "taxes");
}
