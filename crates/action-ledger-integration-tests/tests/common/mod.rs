//! Common test utilities for action-ledger-api integration tests
//!
//! This module provides:
//! - In-memory and failing implementations of `ActionStore`
//! - Router and request builders
//! - GitHub payload fixtures

use action_ledger_api::{create_router, AppState, ServiceConfig, ServiceMetrics};
use action_ledger_core::{ActionRecord, ActionStore, StorageError, StoredAction};
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

// ============================================================================
// In-Memory Store
// ============================================================================

/// Store that keeps rows in memory and honours the newest-first contract
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct InMemoryActionStore {
    rows: Arc<Mutex<Vec<StoredAction>>>,
}

impl InMemoryActionStore {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn rows(&self) -> Vec<StoredAction> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ActionStore for InMemoryActionStore {
    async fn insert(&self, record: &ActionRecord) -> Result<StoredAction, StorageError> {
        let mut rows = self.rows.lock().unwrap();
        let stored = StoredAction::from_record(rows.len() as i64 + 1, record.clone());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredAction>, StorageError> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| {
            b.timestamp
                .parsed()
                .cmp(&a.timestamp.parsed())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

// ============================================================================
// Failing Store
// ============================================================================

/// Store whose every call fails as if the database were unreachable
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct FailingActionStore;

impl FailingActionStore {
    fn error() -> StorageError {
        StorageError::Unavailable {
            message: "connection refused".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ActionStore for FailingActionStore {
    async fn insert(&self, _record: &ActionRecord) -> Result<StoredAction, StorageError> {
        Err(Self::error())
    }

    async fn list_recent(&self, _limit: usize) -> Result<Vec<StoredAction>, StorageError> {
        Err(Self::error())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Err(Self::error())
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Router over the given store with default configuration
#[allow(dead_code)]
pub fn create_test_app(store: Arc<dyn ActionStore>) -> Router {
    let state = AppState::new(
        ServiceConfig::default(),
        store,
        ServiceMetrics::new().unwrap(),
    );
    create_router(state)
}

/// `POST /webhook` with the given event header and JSON body
#[allow(dead_code)]
pub fn webhook_request(event: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Payload Fixtures
// ============================================================================

/// Push to `refs/heads/{branch}` as GitHub sends it (trimmed)
#[allow(dead_code)]
pub fn push_payload(pusher: &str, branch: &str, sha: &str) -> Value {
    json!({
        "ref": format!("refs/heads/{}", branch),
        "before": "0000000000000000000000000000000000000000",
        "after": sha,
        "repository": { "id": 1296269, "full_name": "octocat/Hello-World" },
        "pusher": { "name": pusher, "email": format!("{}@users.noreply.github.com", pusher) },
        "sender": { "login": pusher, "id": 1 },
        "head_commit": {
            "id": sha,
            "message": "Update README.md",
            "timestamp": "2021-04-01T21:30:00+00:00"
        },
        "commits": []
    })
}

/// Pull request event with the given action and merge state
#[allow(dead_code)]
pub fn pull_request_payload(action: &str, number: u64, merged: bool) -> Value {
    json!({
        "action": action,
        "number": number,
        "pull_request": {
            "number": number,
            "state": if action == "closed" { "closed" } else { "open" },
            "title": "Add feature",
            "user": { "login": "octocat", "id": 1 },
            "merged": merged,
            "merged_by": if merged { json!({ "login": "hubot", "id": 2 }) } else { Value::Null },
            "head": { "ref": "feature-x", "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e" },
            "base": { "ref": "main", "sha": "9f1c2d3e4b5a69788812d31d6d4bc2ce9f7b6a10" }
        },
        "repository": { "id": 1296269, "full_name": "octocat/Hello-World" },
        "sender": { "login": "octocat", "id": 1 }
    })
}
