//! PostgREST (Supabase) implementation of [`ActionStore`].
//!
//! Records live in a single table exposed under `{base_url}/rest/v1/{table}`.
//! Every request carries the project API key twice: as the `apikey` header
//! that the Supabase gateway checks, and as a bearer token that PostgREST uses
//! to pick the database role.

use crate::storage::{ActionStore, StorageError, DEFAULT_TABLE_NAME};
use crate::{ActionRecord, StoredAction};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{RequestBuilder, Response};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REST_PATH: &str = "rest/v1";
const USER_AGENT: &str = concat!("action-ledger/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for a PostgREST endpoint
#[derive(Clone)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

impl PostgrestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE_NAME.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for PostgrestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<REDACTED>")
            .field("table", &self.table)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Action store backed by a PostgREST table
pub struct PostgrestActionStore {
    http_client: reqwest::Client,
    table_url: String,
    api_key: String,
}

impl PostgrestActionStore {
    /// Create a store for the configured table.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the HTTP client cannot be created.
    pub fn new(config: PostgrestConfig) -> Result<Self, StorageError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StorageError::Unavailable {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let table_url = format!(
            "{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            REST_PATH,
            config.table
        );

        Ok(Self {
            http_client,
            table_url,
            api_key: config.api_key,
        })
    }

    /// Endpoint for the record table
    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Send a request and turn transport failures and error statuses into
    /// storage errors.
    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response, StorageError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable {
                message: format!("{} request failed: {}", operation, e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        warn!(
            operation = operation,
            status = status.as_u16(),
            message = %message,
            "PostgREST request rejected"
        );

        Err(StorageError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ActionStore for PostgrestActionStore {
    #[instrument(skip(self, record), fields(action = %record.action, author = %record.author))]
    async fn insert(&self, record: &ActionRecord) -> Result<StoredAction, StorageError> {
        let request = self
            .http_client
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(record);

        let response = self.send(request, "insert").await?;

        let rows = response
            .json::<Vec<StoredAction>>()
            .await
            .map_err(|e| StorageError::InvalidResponse {
                message: format!("Failed to parse inserted row: {}", e),
            })?;

        let stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::InvalidResponse {
                message: "Insert returned no rows".to_string(),
            })?;

        debug!(id = stored.id, "Inserted action record");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredAction>, StorageError> {
        let limit = limit.to_string();
        let request = self.http_client.get(&self.table_url).query(&[
            ("select", "*"),
            ("order", "timestamp.desc"),
            ("limit", limit.as_str()),
        ]);

        let response = self.send(request, "list").await?;

        response
            .json::<Vec<StoredAction>>()
            .await
            .map_err(|e| StorageError::InvalidResponse {
                message: format!("Failed to parse action rows: {}", e),
            })
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, StorageError> {
        let request = self
            .http_client
            .head(&self.table_url)
            .query(&[("select", "id")])
            .header("Prefer", "count=exact");

        let response = self.send(request, "count").await?;

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StorageError::InvalidResponse {
                message: "Count response has no Content-Range header".to_string(),
            })?;

        parse_content_range_total(content_range).ok_or_else(|| StorageError::InvalidResponse {
            message: format!("Unexpected Content-Range '{}'", content_range),
        })
    }
}

/// Total from a PostgREST `Content-Range` value such as `0-24/573` or `*/0`
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}

/// PostgREST reports errors as `{"code", "message", "details", "hint"}`
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(json) => json
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
#[path = "postgrest_tests.rs"]
mod tests;
