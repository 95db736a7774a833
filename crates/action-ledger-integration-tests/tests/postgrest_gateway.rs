//! End-to-end tests of the router over the PostgREST store, against a mock
//! PostgREST server.

mod common;

use action_ledger_core::adapters::{PostgrestActionStore, PostgrestConfig};
use axum::http::StatusCode;
use common::{create_test_app, get_request, push_payload, read_json, webhook_request};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "integration-key";

fn store_for(server: &MockServer) -> Arc<PostgrestActionStore> {
    Arc::new(PostgrestActionStore::new(PostgrestConfig::new(server.uri(), API_KEY)).unwrap())
}

/// Verify that a push delivery is inserted through the REST API
#[tokio::test]
async fn test_webhook_inserts_through_rest_api() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/github_actions"))
        .and(header("apikey", API_KEY))
        .and(header("Prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 101,
            "action": "push",
            "author": "octocat",
            "from_branch": null,
            "to_branch": "main",
            "timestamp": "2021-04-01T21:30:00+00:00",
            "request_id": "6dcb09b5",
            "created_at": "2021-04-01T21:30:00.204+00:00"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));
    let payload = push_payload("octocat", "main", "6dcb09b5b57875f334f61aebed695e2e4193db5e");

    // Act
    let response = app.oneshot(webhook_request("push", &payload)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"][0]["id"], 101);
}

/// Verify that PostgREST rows are served with display timestamps
#[tokio::test]
async fn test_feed_reads_through_rest_api() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/github_actions"))
        .and(query_param("order", "timestamp.desc"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2,
                "action": "merge",
                "author": "hubot",
                "from_branch": "feature-x",
                "to_branch": "main",
                "timestamp": "2021-04-01T21:30:00+00:00",
                "request_id": "42",
                "created_at": "2021-04-01T21:30:00+00:00"
            },
            {
                "id": 1,
                "action": "pull_request",
                "author": "octocat",
                "from_branch": "feature-x",
                "to_branch": "main",
                "timestamp": "2021-04-01T09:05:00",
                "request_id": "42",
                "created_at": null
            }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));

    // Act
    let response = app.oneshot(get_request("/api/actions")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body[0]["id"], 2);
    assert_eq!(body[0]["formatted_timestamp"], "01 April 2021 - 09:30 PM UTC");
    assert_eq!(body[1]["formatted_timestamp"], "01 April 2021 - 09:05 AM UTC");
}

/// Verify that one row with an unrecognized timestamp keeps its raw text and
/// the rest of the feed still renders
#[tokio::test]
async fn test_feed_survives_unrecognized_timestamp() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/github_actions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 2,
                "action": "push",
                "author": "octocat",
                "from_branch": null,
                "to_branch": "main",
                "timestamp": "2021-04-01T21:30:00+00:00",
                "request_id": "6dcb09b5"
            },
            {
                "id": 1,
                "action": "push",
                "author": "octocat",
                "from_branch": null,
                "to_branch": "main",
                "timestamp": "2024-01-01T10:00:00+0000",
                "request_id": "9f1c2d3e"
            }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));

    // Act
    let response = app.oneshot(get_request("/api/actions")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["formatted_timestamp"], "01 April 2021 - 09:30 PM UTC");
    assert_eq!(body[1]["formatted_timestamp"], "2024-01-01T10:00:00+0000");
}

/// Verify that health uses the exact count from the Content-Range header
#[tokio::test]
async fn test_health_counts_through_rest_api() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/github_actions"))
        .and(header("Prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-0/573"))
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));

    // Act
    let response = app.oneshot(get_request("/health")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total_actions"], 573);
}

/// Verify that a rejected API key surfaces as an unhealthy service
#[tokio::test]
async fn test_rejected_key_is_unhealthy() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/github_actions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));

    // Act
    let response = app.oneshot(get_request("/health")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].as_str().unwrap().contains("401"));
}

/// Verify that a missing table produces the setup DDL
#[tokio::test]
async fn test_setup_database_with_missing_relation() {
    // Arrange
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/github_actions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.github_actions\" does not exist"
        })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(store_for(&mock_server));

    // Act
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/setup-database")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "Please create the table using Supabase dashboard");
    assert!(body["sql"].as_str().unwrap().contains("github_actions"));
}
