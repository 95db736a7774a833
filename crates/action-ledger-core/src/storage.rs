//! # Storage Module
//!
//! Persistence gateway abstraction for action records.
//!
//! The HTTP layer only talks to [`ActionStore`]; the PostgREST implementation
//! lives in [`crate::adapters::postgrest`] and tests substitute in-memory
//! stores.

use crate::{ActionRecord, StoredAction};
use async_trait::async_trait;

/// Maximum number of records returned by the recent-activity feed
pub const RECENT_ACTIONS_LIMIT: usize = 50;

/// Table used when none is configured
pub const DEFAULT_TABLE_NAME: &str = "github_actions";

// ============================================================================
// Gateway Trait
// ============================================================================

/// Append-only store of action records
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Insert one record and return it as stored, with its generated id
    async fn insert(&self, record: &ActionRecord) -> Result<StoredAction, StorageError>;

    /// Most recent records, newest first, at most `limit` of them
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredAction>, StorageError>;

    /// Total number of stored records
    async fn count(&self) -> Result<u64, StorageError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Errors during record storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage not available: {message}")]
    Unavailable { message: String },

    #[error("Storage rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid storage response: {message}")]
    InvalidResponse { message: String },
}

impl StorageError {
    /// Check if storage error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidResponse { .. } => false,
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// SQL that creates the backing table and its indexes.
///
/// The gateway cannot run DDL through the REST API, so this is handed to the
/// operator to execute in the database dashboard.
pub fn table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE {table} (
    id SERIAL PRIMARY KEY,
    action VARCHAR(50) NOT NULL,
    author VARCHAR(255) NOT NULL,
    from_branch VARCHAR(255),
    to_branch VARCHAR(255) NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    request_id VARCHAR(255),
    created_at TIMESTAMPTZ DEFAULT NOW()
);
CREATE INDEX idx_{table}_timestamp ON {table}(timestamp DESC);
CREATE INDEX idx_{table}_action ON {table}(action);
"
    )
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
