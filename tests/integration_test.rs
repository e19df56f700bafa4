//! Integration tests for the lost-and-found API
//!
//! These tests verify the entire application stack including:
//! - HTTP routing
//! - Request/response handling
//! - Database operations and the cascade on item deletion
//! - The background match scan triggered by item submission

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;

// Import from the main crate
use lostfound::database::{init_db, AppState};
use lostfound::route::create_app;
use lostfound::scanner::{self, MatchScanner};
use lostfound::store::{ItemStore, MatchStore};

/// Helper function to create a test application with a temporary database
/// and a running scan worker
fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let db = Arc::new(init_db(db_path).expect("Failed to initialize test database"));
    let items = ItemStore::new(db.clone());
    let matches = MatchStore::new(db);

    let (scan_queue, _worker) =
        scanner::start(MatchScanner::new(items.clone(), matches.clone()));

    let state = AppState {
        items,
        matches,
        scanner: scan_queue,
    };

    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// A complete, valid report payload
fn report_payload(owner: &str, status: &str, category: &str, title: &str, description: &str) -> Value {
    json!({
        "ownerId": owner,
        "title": title,
        "description": description,
        "status": status,
        "category": category,
        "location": { "name": "Student Center" },
        "contact": { "email": format!("{}@campus.edu", owner) }
    })
}

async fn post_item(app: &axum::Router, payload: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/items")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, response_json(response.into_body()).await)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, response_json(response.into_body()).await)
}

/// Polls the match listing until it holds the expected number of records.
///
/// The scan runs on a background worker, so match rows appear shortly after
/// the create response, not within it.
async fn wait_for_matches(app: &axum::Router, uri: &str, expected: usize) -> Value {
    for _ in 0..100 {
        let (status, body) = get_json(app, uri).await;
        assert_eq!(status, StatusCode::OK);

        if body["total_fetched"].as_u64() == Some(expected as u64) {
            return body;
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    panic!("timed out waiting for {} matches at {}", expected, uri);
}

#[tokio::test]
async fn test_create_item_success() {
    let (app, _temp_db) = setup_test_app();

    let payload = report_payload(
        "user_1",
        "lost",
        "Electronics",
        "Black Dell Laptop",
        "Lost near the library entrance",
    );

    let (status, body) = post_item(&app, &payload).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert_eq!(body["ownerId"], "user_1");
    assert_eq!(body["status"], "lost");
    assert_eq!(body["title"], "Black Dell Laptop");
    assert!(body["createdAt"].is_string());
    assert_eq!(body["createdAt"], body["updatedAt"]);
}

#[tokio::test]
async fn test_create_item_empty_title_rejected() {
    let (app, _temp_db) = setup_test_app();

    let payload = report_payload("user_1", "lost", "Keys", "   ", "Keys on a red lanyard");

    let (status, body) = post_item(&app, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_create_item_empty_contact_email_rejected() {
    let (app, _temp_db) = setup_test_app();

    let mut payload = report_payload("user_1", "found", "Keys", "House keys", "Found by the gym");
    payload["contact"]["email"] = json!("");

    let (status, body) = post_item(&app, &payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_get_item() {
    let (app, _temp_db) = setup_test_app();

    let payload = report_payload("user_1", "found", "Bags", "Blue backpack", "Left in lecture hall B");
    let (_, created) = post_item(&app, &payload).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = get_json(&app, &format!("/api/items/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], *id);
    assert_eq!(body["category"], "Bags");
}

#[tokio::test]
async fn test_get_item_not_found() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = get_json(&app, "/api/items/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_list_items_filters_are_conjunctive() {
    let (app, _temp_db) = setup_test_app();

    post_item(&app, &report_payload("alice", "lost", "Keys", "Dorm keys", "Lost by the dorms")).await;
    post_item(&app, &report_payload("alice", "lost", "Bags", "Gray tote bag", "Lost at the gym")).await;
    post_item(&app, &report_payload("bob", "found", "Keys", "Bike keys", "Found at the bike racks")).await;

    let (status, body) = get_json(&app, "/api/items?ownerId=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_fetched"], 2);

    let (_, body) = get_json(&app, "/api/items?status=found").await;
    assert_eq!(body["total_fetched"], 1);
    assert_eq!(body["data"][0]["ownerId"], "bob");

    let (_, body) = get_json(&app, "/api/items?ownerId=alice&status=found").await;
    assert_eq!(body["total_fetched"], 0);
}

#[tokio::test]
async fn test_list_items_pagination() {
    let (app, _temp_db) = setup_test_app();

    for i in 1..=15 {
        let payload = report_payload(
            "pagination_user",
            "lost",
            "Clothing",
            &format!("Campus hoodie number {}", i),
            "Lost somewhere on the quad",
        );
        post_item(&app, &payload).await;
    }

    let (_, body) = get_json(&app, "/api/items?ownerId=pagination_user&page=1&limit=10").await;
    assert_eq!(body["total_fetched"], 10);
    assert_eq!(body["page"], 1);

    let (_, body) = get_json(&app, "/api/items?ownerId=pagination_user&page=2&limit=10").await;
    assert_eq!(body["total_fetched"], 5);
    assert_eq!(body["page"], 2);
}

#[tokio::test]
async fn test_update_item() {
    let (app, _temp_db) = setup_test_app();

    let (_, created) = post_item(
        &app,
        &report_payload("user_1", "lost", "Electronics", "Silver headphones", "Lost in the cafeteria"),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/items/{}", id))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "title": "Silver Sony headphones" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["title"], "Silver Sony headphones");
    // untouched fields survive, status cannot change through this endpoint
    assert_eq!(body["category"], "Electronics");
    assert_eq!(body["status"], "lost");
    assert_ne!(body["updatedAt"], body["createdAt"]);
}

#[tokio::test]
async fn test_update_item_rejects_empty_field() {
    let (app, _temp_db) = setup_test_app();

    let (_, created) = post_item(
        &app,
        &report_payload("user_1", "lost", "Keys", "Car keys", "Lost in parking lot C"),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/items/{}", id))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "title": "" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_matching_flow_lost_then_found() {
    let (app, _temp_db) = setup_test_app();

    // Submitting a lost item with no found pool yields zero matches
    let (_, lost) = post_item(
        &app,
        &report_payload(
            "alice",
            "lost",
            "Electronics",
            "Black Dell Laptop",
            "Lost near the library entrance",
        ),
    )
    .await;
    let lost_id = lost["id"].as_str().unwrap();

    let (_, body) = get_json(&app, "/api/matches").await;
    assert_eq!(body["total_fetched"], 0);

    // A matching found item produces exactly one pending match
    let (_, found) = post_item(
        &app,
        &report_payload(
            "bob",
            "found",
            "Electronics",
            "Dell Laptop Black",
            "Picked up near the library entrance",
        ),
    )
    .await;
    let found_id = found["id"].as_str().unwrap();

    let body = wait_for_matches(&app, "/api/matches", 1).await;
    let record = &body["data"][0];

    assert_eq!(record["lostItemId"], *lost_id);
    assert_eq!(record["foundItemId"], *found_id);
    assert_eq!(record["status"], "pending");
    assert!(record["confidence"].as_f64().unwrap() >= 0.45);

    // both referenced items come back resolved
    assert_eq!(record["lostItem"]["id"], *lost_id);
    assert_eq!(record["foundItem"]["id"], *found_id);
}

#[tokio::test]
async fn test_no_match_for_unrelated_items() {
    let (app, _temp_db) = setup_test_app();

    post_item(&app, &report_payload("carol", "lost", "Keys", "House keys", "Lost at the gym")).await;
    post_item(&app, &report_payload("dave", "found", "Bags", "Blue backpack", "Found in lecture hall B")).await;

    // A pair that does match, submitted afterwards: once its match shows up,
    // the worker has necessarily processed the unrelated pair above too.
    let (_, lost) = post_item(
        &app,
        &report_payload("erin", "lost", "Electronics", "White iPhone charger", "Lost in the study room"),
    )
    .await;
    let lost_id = lost["id"].as_str().unwrap();
    post_item(
        &app,
        &report_payload("frank", "found", "Electronics", "White iPhone charger", "Found in the study room"),
    )
    .await;

    let body = wait_for_matches(&app, "/api/matches", 1).await;
    assert_eq!(body["data"][0]["lostItemId"], *lost_id);
}

#[tokio::test]
async fn test_match_filters() {
    let (app, _temp_db) = setup_test_app();

    // two independent matched pairs
    let (_, lost_a) = post_item(
        &app,
        &report_payload("alice", "lost", "Electronics", "Black Dell Laptop", "Lost near the library"),
    )
    .await;
    post_item(
        &app,
        &report_payload("bob", "found", "Electronics", "Black Dell Laptop", "Found near the library"),
    )
    .await;

    let (_, lost_b) = post_item(
        &app,
        &report_payload("carol", "lost", "Bags", "Green hiking backpack", "Lost on the north trail"),
    )
    .await;
    post_item(
        &app,
        &report_payload("dave", "found", "Bags", "Green hiking backpack", "Found on the north trail"),
    )
    .await;

    wait_for_matches(&app, "/api/matches", 2).await;

    let lost_a_id = lost_a["id"].as_str().unwrap();
    let (_, body) = get_json(&app, &format!("/api/matches?items={}", lost_a_id)).await;
    assert_eq!(body["total_fetched"], 1);
    assert_eq!(body["data"][0]["lostItemId"], *lost_a_id);

    let lost_b_id = lost_b["id"].as_str().unwrap();
    let (_, body) = get_json(&app, "/api/matches?ownerId=carol").await;
    assert_eq!(body["total_fetched"], 1);
    assert_eq!(body["data"][0]["lostItemId"], *lost_b_id);

    let (_, body) = get_json(&app, "/api/matches?ownerId=nobody").await;
    assert_eq!(body["total_fetched"], 0);
}

#[tokio::test]
async fn test_delete_item_cascades_matches() {
    let (app, _temp_db) = setup_test_app();

    let (_, lost) = post_item(
        &app,
        &report_payload("alice", "lost", "Electronics", "Black Dell Laptop", "Lost near the library"),
    )
    .await;
    let lost_id = lost["id"].as_str().unwrap();
    post_item(
        &app,
        &report_payload("bob", "found", "Electronics", "Black Dell Laptop", "Found near the library"),
    )
    .await;

    wait_for_matches(&app, "/api/matches", 1).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/items/{}", lost_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["deleted_id"], *lost_id);
    assert_eq!(body["removed_matches"], 1);

    let (_, body) = get_json(&app, "/api/matches").await;
    assert_eq!(body["total_fetched"], 0);

    let (status, _) = get_json(&app, &format!("/api/items/{}", lost_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_item_not_found() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/items/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approve_is_final() {
    let (app, _temp_db) = setup_test_app();

    post_item(
        &app,
        &report_payload("alice", "lost", "Electronics", "Black Dell Laptop", "Lost near the library"),
    )
    .await;
    post_item(
        &app,
        &report_payload("bob", "found", "Electronics", "Black Dell Laptop", "Found near the library"),
    )
    .await;

    let body = wait_for_matches(&app, "/api/matches", 1).await;
    let match_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let patch = |status: &str| {
        let uri = format!("/api/matches/{}", match_id);
        let body = json!({ "status": status }).to_string();
        let app = app.clone();
        async move {
            let response = app
                .oneshot(
                    Request::builder()
                        .method("PATCH")
                        .uri(uri)
                        .header("content-type", "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            let status = response.status();
            (status, response_json(response.into_body()).await)
        }
    };

    let (status, body) = patch("approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    // the first terminal transition wins; a later denial is a no-op
    let (status, body) = patch("denied").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    // a match cannot be sent back to pending
    let (status, _) = patch("pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_match_status_not_found() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/matches/nonexistent")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "status": "approved" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
