//! # Action Ledger Core
//!
//! Domain logic for the Action Ledger webhook receiver.
//!
//! This crate turns GitHub webhook payloads into normalized action records and
//! persists them through a storage gateway:
//! - [`webhook`] classifies an event type plus payload into an [`ActionRecord`]
//! - [`storage`] defines the [`storage::ActionStore`] gateway abstraction
//! - [`adapters`] holds the PostgREST (Supabase) implementation of that gateway
//! - [`display`] renders timestamps for the activity feed
//!
//! ## Usage
//!
//! ```rust
//! use action_ledger_core::{webhook, ActionKind};
//!
//! let payload = serde_json::json!({
//!     "ref": "refs/heads/main",
//!     "pusher": { "name": "octocat" },
//!     "head_commit": { "id": "9f1c2d3e4b5a69788" }
//! });
//!
//! let record = webhook::classify("push", &payload).unwrap();
//! assert_eq!(record.action, ActionKind::Push);
//! assert_eq!(record.to_branch, "main");
//! assert_eq!(record.request_id, "9f1c2d3e");
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod adapters;
pub mod display;
pub mod storage;
pub mod webhook;

pub use storage::{ActionStore, StorageError};

// ============================================================================
// Action Types
// ============================================================================

/// The classified meaning of a repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Push,
    PullRequest,
    Merge,
}

impl ActionKind {
    /// Get string representation, as stored in the `action` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(Self::Push),
            "pull_request" => Ok(Self::PullRequest),
            "merge" => Ok(Self::Merge),
            _ => Err(ParseError::InvalidFormat {
                expected: "push, pull_request, or merge".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Normalized record describing one repository event
///
/// Produced by the webhook classifier and handed to the storage gateway for
/// insertion. Use the constructors so that `from_branch` is only present for
/// pull request and merge actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: ActionKind,
    pub author: String,
    pub from_branch: Option<String>,
    pub to_branch: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl ActionRecord {
    /// Create a push record (no source branch)
    pub fn push(
        author: impl Into<String>,
        to_branch: impl Into<String>,
        request_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: ActionKind::Push,
            author: author.into(),
            from_branch: None,
            to_branch: to_branch.into(),
            timestamp,
            request_id: request_id.into(),
        }
    }

    /// Create a record for a newly opened pull request
    pub fn pull_request(
        author: impl Into<String>,
        from_branch: impl Into<String>,
        to_branch: impl Into<String>,
        request_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: ActionKind::PullRequest,
            author: author.into(),
            from_branch: Some(from_branch.into()),
            to_branch: to_branch.into(),
            timestamp,
            request_id: request_id.into(),
        }
    }

    /// Create a record for a merged pull request
    pub fn merge(
        author: impl Into<String>,
        from_branch: impl Into<String>,
        to_branch: impl Into<String>,
        request_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: ActionKind::Merge,
            author: author.into(),
            from_branch: Some(from_branch.into()),
            to_branch: to_branch.into(),
            timestamp,
            request_id: request_id.into(),
        }
    }
}

/// Action record as read back from the store
///
/// Carries the server-generated primary key and creation time in addition to
/// the normalized fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAction {
    pub id: i64,
    pub action: ActionKind,
    pub author: String,
    #[serde(default)]
    pub from_branch: Option<String>,
    pub to_branch: String,
    pub timestamp: StoredTimestamp,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<StoredTimestamp>,
}

impl StoredAction {
    /// Build a stored row from a normalized record and its assigned key
    pub fn from_record(id: i64, record: ActionRecord) -> Self {
        Self {
            id,
            action: record.action,
            author: record.author,
            from_branch: record.from_branch,
            to_branch: record.to_branch,
            timestamp: record.timestamp.into(),
            request_id: Some(record.request_id),
            created_at: Some(record.timestamp.into()),
        }
    }
}

/// Timestamp column of a stored row, kept as the text the store returned
///
/// Rows are read back without interpreting the value so that one row in an
/// unexpected format cannot fail a whole listing. Use [`StoredTimestamp::parsed`]
/// to get the instant when the text is understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredTimestamp(String);

impl StoredTimestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant this value denotes, `None` when the format is not recognized
    pub fn parsed(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.0).ok()
    }
}

impl From<DateTime<Utc>> for StoredTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.to_rfc3339())
    }
}

impl fmt::Display for StoredTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serde adapter for record timestamps
///
/// Writes RFC 3339. Reads RFC 3339, or a naive ISO-8601 date-time which is
/// taken to be UTC (rows written by older clients carry no offset).
mod timestamp_format {
    use super::*;
    use serde::{Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| ParseError::InvalidFormat {
                expected: "RFC3339 or ISO-8601 datetime".to_string(),
                actual: raw.to_string(),
            })
    }
}

/// Parse a stored timestamp string (RFC 3339 or naive UTC)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    timestamp_format::parse_timestamp(raw)
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got {actual}")]
    InvalidFormat { expected: String, actual: String },
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
