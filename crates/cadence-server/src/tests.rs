//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cadence_core::test_utils::{netflix_monthly, series, SAMPLE_CSV};
use http_body_util::BodyExt;
use tower::ServiceExt;

const BOUNDARY: &str = "cadence-test-boundary";

fn test_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        ..Default::default()
    }
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), None, test_config());
    (app, db)
}

/// App with the Netflix series already imported (no detection run yet)
fn seeded_app() -> (Router, Database) {
    let (app, db) = setup_test_app();
    db.import_file("bank.csv", &netflix_monthly()).unwrap();
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(method: &str, uri: &str, csv: &str, name: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    if let Some(name) = name {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bank.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn recalculate(app: &Router) -> serde_json::Value {
    let response = send(app, empty_request("POST", "/api/recurring/recalculate")).await;
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await
}

/// Wait until `count` detection runs have been committed
async fn wait_for_runs(db: &Database, count: usize) {
    for _ in 0..300 {
        if db.list_detection_runs(100).unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("expected {} detection runs", count);
}

// ========== Auth Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        api_keys: vec!["secret-key".to_string()],
        ..Default::default()
    };
    let app = create_router(db, None, config);

    let response = send(&app, get("/api/files")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");

    let response = send(
        &app,
        Request::builder()
            .uri("/api/files")
            .header("authorization", "Bearer wrong-key")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Request::builder()
            .uri("/api/files")
            .header("authorization", "Bearer secret-key")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string(), "longer-key".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(validate_api_key("longer-key", &keys));
    assert!(!validate_api_key("ab", &keys));
    assert!(!validate_api_key("abcd", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("abc", &[]));
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();
    let response = send(&app, get("/api/files")).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

// ========== File API Tests ==========

#[tokio::test]
async fn test_upload_file() {
    let (app, db) = setup_test_app();

    let response = send(
        &app,
        multipart_request("POST", "/api/files", SAMPLE_CSV, Some("January export")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 6);
    assert_eq!(json["skipped_rows"], 0);
    assert_eq!(json["file"]["name"], "January export");
    assert_eq!(json["file"]["transaction_count"], 6);

    assert_eq!(db.count_transactions().unwrap(), 6);
}

#[tokio::test]
async fn test_upload_uses_file_name_by_default() {
    let (app, _db) = setup_test_app();

    let response = send(&app, multipart_request("POST", "/api/files", SAMPLE_CSV, None)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["file"]["name"], "bank.csv");
}

#[tokio::test]
async fn test_upload_rejects_csv_without_required_columns() {
    let (app, db) = setup_test_app();

    let csv = "Date,Description,Amount\n2024-01-01,Coffee,3.50\n";
    let response = send(&app, multipart_request("POST", "/api/files", csv, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(db.list_files().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let (app, _db) = setup_test_app();

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nx\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/files")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Missing file field");
}

#[tokio::test]
async fn test_list_and_get_files() {
    let (app, db) = seeded_app();
    let file_id = db.list_files().unwrap()[0].id;

    let response = send(&app, get("/api/files")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["transaction_count"], 4);

    let response = send(&app, get(&format!("/api/files/{}", file_id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "bank.csv");

    let response = send(&app, get("/api/files/9999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reimport_file() {
    let (app, db) = seeded_app();
    let file_id = db.list_files().unwrap()[0].id;

    let response = send(
        &app,
        multipart_request("PUT", &format!("/api/files/{}", file_id), SAMPLE_CSV, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 6);
    assert_eq!(json["file"]["id"], file_id);
    assert_eq!(json["file"]["transaction_count"], 6);

    let response = send(
        &app,
        multipart_request("PUT", "/api/files/9999", SAMPLE_CSV, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_file() {
    let (app, db) = seeded_app();
    let file_id = db.list_files().unwrap()[0].id;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/files/{}", file_id))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);

    assert_eq!(db.count_transactions().unwrap(), 0);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/files/{}", file_id))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Transaction API Tests ==========

#[tokio::test]
async fn test_list_transactions() {
    let (app, db) = seeded_app();
    db.import_file(
        "gym.csv",
        &series("Gym", "Health", 30.0, "2024-01-05", 30, 3),
    )
    .unwrap();

    let response = send(&app, get("/api/transactions")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 7);
    assert_eq!(json["pagination"]["page"], 1);
    assert_eq!(json["pagination"]["per_page"], 50);
    assert_eq!(json["pagination"]["total_items"], 7);
    assert_eq!(json["pagination"]["total_pages"], 1);
    // Newest first
    assert_eq!(json["data"][0]["transaction_date"], "2024-03-31");

    let response = send(&app, get("/api/transactions?per_page=3&page=3")).await;
    let json = get_body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["pagination"]["total_pages"], 3);

    let response = send(&app, get("/api/transactions?source=Gym")).await;
    let json = get_body_json(response).await;
    let transactions = json["data"].as_array().unwrap();
    assert_eq!(transactions.len(), 3);
    assert!(transactions.iter().all(|t| t["source"] == "Gym"));
}

#[tokio::test]
async fn test_list_transactions_filters() {
    let (app, db) = seeded_app();
    db.import_file(
        "gym.csv",
        &series("Gym", "Health", 30.0, "2024-01-05", 30, 3),
    )
    .unwrap();

    let uri = "/api/transactions?file_names=gym&from=2024-02-01&to=2024-03-31";
    let json = get_body_json(send(&app, get(uri)).await).await;
    assert_eq!(json["pagination"]["total_items"], 2);

    let uri = "/api/transactions?exclude_sources=Gym,,Other&is_paid=true";
    let json = get_body_json(send(&app, get(uri)).await).await;
    assert_eq!(json["pagination"]["total_items"], 4);

    let response = send(&app, get("/api/transactions?from=2024-13-01")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, get("/api/transactions?file_ids=1,abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_update_delete_transaction() {
    let (app, db) = seeded_app();
    let id = db.list_all_transactions().unwrap()[0].id;
    let uri = format!("/api/transactions/{}", id);

    let json = get_body_json(send(&app, get(&uri)).await).await;
    assert_eq!(json["source"], "Netflix");
    assert_eq!(json["bank"], "");

    let response = send(
        &app,
        json_request(
            "PUT",
            &uri,
            serde_json::json!({ "is_paid": false, "bank": "mBank" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["is_paid"], false);
    assert_eq!(json["bank"], "mBank");
    assert_eq!(json["amount"], 45.0);

    let response = send(
        &app,
        json_request("PUT", &uri, serde_json::json!({ "file_id": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        &app,
        json_request("PUT", &uri, serde_json::json!({ "source": " " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.count_transactions().unwrap(), 3);

    let response = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(
        &app,
        json_request("PUT", &uri, serde_json::json!({ "is_paid": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_editing_detection_fields_recomputes() {
    let (app, db) = seeded_app();
    let id = db.list_all_transactions().unwrap()[0].id;

    // Payment status never changes a pattern
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/transactions/{}", id),
            serde_json::json!({ "is_paid": false }),
        ),
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(db.list_detection_runs(10).unwrap().is_empty());

    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/transactions/{}", id),
            serde_json::json!({ "category": "Streaming" }),
        ),
    )
    .await;
    wait_for_runs(&db, 1).await;
    let runs = db.list_detection_runs(10).unwrap();
    assert_eq!(runs[0].trigger, cadence_core::RunTrigger::Background);
}

// ========== Stats API Tests ==========

#[tokio::test]
async fn test_stats_endpoints() {
    let (app, db) = seeded_app();
    db.import_file(
        "gym.csv",
        &series("Gym", "Health", 30.0, "2024-01-05", 30, 2),
    )
    .unwrap();

    let json = get_body_json(send(&app, get("/api/stats/summary")).await).await;
    assert_eq!(json["total_spent"], 240.0);
    assert_eq!(json["paid_count"], 6);
    assert_eq!(json["unpaid_count"], 0);

    let json = get_body_json(send(&app, get("/api/stats/categories")).await).await;
    let categories = json.as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["category"], "Subscription");
    assert_eq!(categories[0]["percentage"], 75.0);
    assert_eq!(categories[1]["percentage"], 25.0);

    let uri = "/api/stats/sources?exclude_sources=Netflix";
    let json = get_body_json(send(&app, get(uri)).await).await;
    let sources = json.as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source"], "Gym");
    assert_eq!(sources[0]["percentage"], 100.0);

    let json = get_body_json(send(&app, get("/api/stats/top-category")).await).await;
    assert_eq!(json["category"], "Subscription");
    assert_eq!(json["total"], 180.0);

    let uri = "/api/stats/top-category?from=2030-01-01";
    let json = get_body_json(send(&app, get(uri)).await).await;
    assert!(json.is_null());

    let response = send(&app, get("/api/stats/summary?to=yesterday")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Recurring API Tests ==========

#[tokio::test]
async fn test_recalculate_and_list() {
    let (app, _db) = seeded_app();

    let results = recalculate(&app).await;
    assert_eq!(results["transactions_scanned"], 4);
    assert_eq!(results["temporal_patterns"], 1);
    assert_eq!(results["similarity_patterns"], 0);
    assert_eq!(results["reconcile"]["inserted"], 1);

    let response = send(&app, get("/api/recurring")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    let patterns = json["patterns"].as_array().unwrap();
    assert_eq!(patterns.len(), 1);
    let pattern = &patterns[0];
    assert_eq!(pattern["source"], "Netflix");
    assert_eq!(pattern["detection_mode"], "temporal");
    assert_eq!(pattern["temporal"]["frequency"], "monthly");
    assert_eq!(pattern["temporal"]["avg_interval_days"], 30);
    assert_eq!(pattern["temporal"]["next_expected"], "2024-04-30");
    assert_eq!(pattern["amount"]["average"], 45.0);
    assert_eq!(pattern["confidence"], 1.0);
    assert!(pattern["is_confirmed"].is_null());

    assert_eq!(json["summary"]["total_monthly"], 45.0);
    assert_eq!(json["summary"]["total_yearly"], 540.0);
    assert_eq!(json["summary"]["pattern_count"], 1);
}

#[tokio::test]
async fn test_recalculate_is_idempotent() {
    let (app, db) = seeded_app();

    recalculate(&app).await;
    let first = db.list_patterns(&Default::default()).unwrap();

    let results = recalculate(&app).await;
    assert_eq!(results["temporal_patterns"], 1);
    let second = db.list_patterns(&Default::default()).unwrap();

    assert_eq!(first.patterns.len(), second.patterns.len());
    assert_eq!(first.summary, second.summary);
    assert_eq!(
        first.patterns[0].temporal,
        second.patterns[0].temporal
    );
}

#[tokio::test]
async fn test_recalculate_background() {
    let (app, db) = seeded_app();

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/recurring/recalculate?background=true")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["started"], true);

    // The background run shares nothing with the response, so poll the store
    for _ in 0..200 {
        if !db.list_patterns(&Default::default()).unwrap().patterns.is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("background detection did not store a pattern");
}

#[tokio::test]
async fn test_get_recurring_with_transactions() {
    let (app, db) = seeded_app();
    recalculate(&app).await;
    let id = db.list_patterns(&Default::default()).unwrap().patterns[0].id;

    let response = send(&app, get(&format!("/api/recurring/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["transactions"].as_array().unwrap().len(), 4);

    let response = send(&app, get("/api/recurring/9999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_and_label_pattern() {
    let (app, db) = seeded_app();
    recalculate(&app).await;
    let id = db.list_patterns(&Default::default()).unwrap().patterns[0].id;

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/recurring/{}", id),
            serde_json::json!({ "is_confirmed": true, "user_label": "Streaming" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["is_confirmed"], true);
    assert_eq!(json["user_label"], "Streaming");

    // Confirmation survives a recomputation
    recalculate(&app).await;
    let response = send(&app, get("/api/recurring?confirmed_only=true")).await;
    let json = get_body_json(response).await;
    let patterns = json["patterns"].as_array().unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0]["id"], id);
    assert_eq!(patterns[0]["user_label"], "Streaming");

    let decisions = db.list_decisions(10).unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].pattern_id, id);
    assert_eq!(decisions[0].actor, "local-dev");
    assert_eq!(decisions[0].is_confirmed, Some(true));
}

#[tokio::test]
async fn test_update_rejects_unknown_fields() {
    let (app, db) = seeded_app();
    recalculate(&app).await;
    let id = db.list_patterns(&Default::default()).unwrap().patterns[0].id;

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/recurring/{}", id),
            serde_json::json!({ "confidence": 0.99 }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let pattern = db.get_pattern(id).unwrap().unwrap();
    assert_eq!(pattern.confidence, 1.0);
}

#[tokio::test]
async fn test_update_missing_pattern() {
    let (app, _db) = setup_test_app();

    let response = send(
        &app,
        json_request(
            "PUT",
            "/api/recurring/9999",
            serde_json::json!({ "is_confirmed": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_pattern() {
    let (app, db) = seeded_app();
    recalculate(&app).await;
    let id = db.list_patterns(&Default::default()).unwrap().patterns[0].id;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/recurring/{}", id))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(send(&app, get("/api/recurring")).await).await;
    assert!(json["patterns"].as_array().unwrap().is_empty());
    assert_eq!(json["summary"]["pattern_count"], 0);

    let json = get_body_json(send(&app, get("/api/recurring?include_rejected=true")).await).await;
    let patterns = json["patterns"].as_array().unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0]["is_confirmed"], false);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/recurring/9999")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_min_confidence_filter() {
    let (app, _db) = seeded_app();
    recalculate(&app).await;

    let json = get_body_json(send(&app, get("/api/recurring?min_confidence=0.5")).await).await;
    assert_eq!(json["patterns"].as_array().unwrap().len(), 1);

    let json = get_body_json(send(&app, get("/api/recurring?min_confidence=1.01")).await).await;
    assert!(json["patterns"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recalculate_conflicts_with_run_in_flight() {
    let (app, db) = seeded_app();

    // Hold the write lock so the background run parks before its reconcile
    let conn = db.conn().unwrap();
    conn.execute_batch("BEGIN IMMEDIATE").unwrap();

    let response = send(
        &app,
        empty_request("POST", "/api/recurring/recalculate?background=true"),
    )
    .await;
    let json = get_body_json(response).await;
    assert_eq!(json["started"], true);

    let response = send(
        &app,
        empty_request("POST", "/api/recurring/recalculate?background=true"),
    )
    .await;
    let json = get_body_json(response).await;
    assert_eq!(json["started"], false);

    let response = send(&app, empty_request("POST", "/api/recurring/recalculate")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Detection already running");

    conn.execute_batch("ROLLBACK").unwrap();
    drop(conn);
    wait_for_runs(&db, 1).await;
    assert_eq!(db.list_patterns(&Default::default()).unwrap().patterns.len(), 1);
}

// ========== History API Tests ==========

#[tokio::test]
async fn test_history_endpoints() {
    let (app, db) = seeded_app();
    recalculate(&app).await;
    recalculate(&app).await;
    let id = db.list_patterns(&Default::default()).unwrap().patterns[0].id;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/recurring/{}", id))
        .header("authorization", "Bearer whatever")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);

    let json = get_body_json(send(&app, get("/api/recurring/runs?limit=1")).await).await;
    let runs = json.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["trigger"], "manual");
    assert_eq!(runs[0]["transactions_scanned"], 4);
    assert_eq!(runs[0]["reconcile"]["inserted"], 1);

    let json = get_body_json(send(&app, get("/api/recurring/runs")).await).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let json = get_body_json(send(&app, get("/api/recurring/decisions")).await).await;
    let decisions = json.as_array().unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0]["pattern_id"], id);
    assert_eq!(decisions[0]["source"], "Netflix");
    assert_eq!(decisions[0]["actor"], "api-key");
    assert_eq!(decisions[0]["is_confirmed"], false);
    assert!(decisions[0]["user_label"].is_null());
}

// ========== Error Mapping Tests ==========

#[test]
fn test_core_errors_map_to_status() {
    let err = AppError::from_core(cadence_core::Error::NotFound("file 1".into()));
    assert_eq!(err.status, StatusCode::NOT_FOUND);

    let err = AppError::from_core(cadence_core::Error::Import("bad header".into()));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "bad header");

    let err = AppError::from_core(cadence_core::Error::Config("oops".into()));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message, "An internal error occurred");
}
