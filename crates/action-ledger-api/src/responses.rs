//! Response types for the API.

use action_ledger_core::display::format_display_timestamp;
use action_ledger_core::StoredAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Webhook
// ============================================================================

/// Webhook response for a stored record
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    pub data: Vec<StoredAction>,
}

impl WebhookResponse {
    pub fn success(stored: StoredAction) -> Self {
        Self {
            status: "success".to_string(),
            data: vec![stored],
        }
    }
}

/// Webhook response when the delivery is not recorded
#[derive(Debug, Serialize, Deserialize)]
pub struct IgnoredResponse {
    pub status: String,
    /// The `X-GitHub-Event` value, `null` when the header was absent
    pub event: Option<String>,
}

impl IgnoredResponse {
    pub fn new(event: Option<String>) -> Self {
        Self {
            status: "ignored".to_string(),
            event,
        }
    }
}

// ============================================================================
// Activity Feed
// ============================================================================

/// Stored action as shown in the activity feed
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionView {
    #[serde(flatten)]
    pub action: StoredAction,
    pub formatted_timestamp: String,
}

impl From<StoredAction> for ActionView {
    /// Falls back to the stored text when the timestamp cannot be parsed
    fn from(action: StoredAction) -> Self {
        let formatted_timestamp = match action.timestamp.parsed() {
            Some(timestamp) => format_display_timestamp(&timestamp),
            None => action.timestamp.to_string(),
        };
        Self {
            action,
            formatted_timestamp,
        }
    }
}

// ============================================================================
// Health and Setup
// ============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_actions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn healthy(total_actions: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            database: Some("connected".to_string()),
            total_actions: Some(total_actions),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            timestamp: Utc::now(),
            database: None,
            total_actions: None,
            error: Some(error.into()),
        }
    }
}

/// Table setup diagnostic response
#[derive(Debug, Serialize, Deserialize)]
pub struct SetupDatabaseResponse {
    pub status: String,
    /// DDL for the operator to run when the table is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

impl SetupDatabaseResponse {
    pub fn table_exists() -> Self {
        Self {
            status: "Table already exists".to_string(),
            sql: None,
        }
    }

    pub fn create_table(sql: String) -> Self {
        Self {
            status: "Please create the table using Supabase dashboard".to_string(),
            sql: Some(sql),
        }
    }
}
