mod common;

use common::{config_for, connect_seeded, connect_with, BASE};
use serde_json::json;
use sforce::QueryResult;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SOQL: &str = "SELECT Id, Name FROM Account";

fn record(name: &str) -> serde_json::Value {
    json!({"attributes": {"type": "Account"}, "Name": name})
}

async fn mount_first_page(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/query/")))
        .and(query_param("q", SOQL))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_cursor(server: &MockServer, cursor: &str, body: serde_json::Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path(cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn three_pages_concatenate_in_order() {
    let server = MockServer::start().await;
    let p2 = format!("{BASE}/query/01g-2000");
    let p3 = format!("{BASE}/query/01g-4000");

    mount_first_page(
        &server,
        json!({
            "totalSize": 4, "done": false,
            "records": [record("one"), record("two")],
            "nextRecordsUrl": p2,
        }),
    )
    .await;
    mount_cursor(
        &server,
        &p2,
        json!({"done": false, "records": [record("three")], "nextRecordsUrl": p3}),
        1,
    )
    .await;
    mount_cursor(&server, &p3, json!({"done": true, "records": [record("four")]}), 1).await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.query_follow_next(SOQL).await;

    assert_eq!(result.http_status, 200);
    let view = QueryResult::from(&result);
    assert!(!view.has_more);
    let names: Vec<_> = view
        .records
        .iter()
        .map(|r| r.get("Name").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["one", "two", "three", "four"]);
}

#[tokio::test]
async fn repeated_cursor_terminates_the_walk() {
    let server = MockServer::start().await;
    let p2 = format!("{BASE}/query/01g-2000");

    mount_first_page(
        &server,
        json!({"done": false, "records": [record("one")], "nextRecordsUrl": p2}),
    )
    .await;
    // misbehaving server: the second page points back at itself
    mount_cursor(
        &server,
        &p2,
        json!({"done": false, "records": [record("two")], "nextRecordsUrl": p2}),
        1,
    )
    .await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.query_follow_next(SOQL).await;

    let view = QueryResult::from(&result);
    assert_eq!(view.records.len(), 2);
    assert!(view.has_more);
}

#[tokio::test]
async fn page_bound_stops_an_endless_chain() {
    let server = MockServer::start().await;
    let p2 = format!("{BASE}/query/01g-2000");
    let p3 = format!("{BASE}/query/01g-4000");

    mount_first_page(
        &server,
        json!({"done": false, "records": [record("one")], "nextRecordsUrl": p2}),
    )
    .await;
    mount_cursor(
        &server,
        &p2,
        json!({"done": false, "records": [record("two")], "nextRecordsUrl": p3}),
        1,
    )
    .await;
    // never fetched: the bound is reached first
    mount_cursor(&server, &p3, json!({"done": true, "records": [record("three")]}), 0).await;

    let mut config = config_for(&server);
    config.max_pages = 2;
    let (sf, _) = connect_with(config, "tok", "rtok").await;
    let result = sf.query_follow_next(SOQL).await;

    let view = QueryResult::from(&result);
    assert_eq!(view.records.len(), 2);
    assert!(view.has_more);
}

#[tokio::test]
async fn failing_page_fails_the_whole_aggregate() {
    let server = MockServer::start().await;
    let p2 = format!("{BASE}/query/01g-2000");

    mount_first_page(
        &server,
        json!({"done": false, "records": [record("one")], "nextRecordsUrl": p2}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(p2))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "server unavailable",
            "errorCode": "SERVER_UNAVAILABLE",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.query_follow_next(SOQL).await;

    // no truncated success: the failed page is the result
    assert!(!result.success);
    assert_eq!(result.http_status, 500);
    assert_eq!(result.message_string, "server unavailable");
    assert!(QueryResult::from(&result).records.is_empty());
}

#[tokio::test]
async fn empty_first_page_is_not_followed() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"totalSize": 0, "done": true, "records": []}),
    )
    .await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.query_follow_next(SOQL).await;

    let view = QueryResult::from(&result);
    assert!(view.records.is_empty());
    assert!(!view.has_more);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn query_all_uses_its_own_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/queryAll/")))
        .and(query_param("q", SOQL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1, "done": true,
            "records": [record("deleted one")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.query_all_follow_next(SOQL).await;
    assert_eq!(QueryResult::from(&result).records.len(), 1);
}

#[tokio::test]
async fn search_passes_through_the_dispatcher() {
    let server = MockServer::start().await;
    let sosl = "FIND {Acme} IN NAME FIELDS";
    Mock::given(method("GET"))
        .and(path(format!("{BASE}/search/")))
        .and(query_param("q", sosl))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"searchRecords": [record("one")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (sf, _) = connect_seeded(&server, "tok", "rtok").await;
    let result = sf.search(sosl).await;
    assert_eq!(result.http_status, 200);
    assert!(result.body.contains_key("searchRecords"));
}
