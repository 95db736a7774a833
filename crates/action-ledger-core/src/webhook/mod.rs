//! # Webhook Classification Module
//!
//! Decides which normalized action, if any, a GitHub webhook delivery
//! represents and extracts the fields of the resulting [`ActionRecord`].
//!
//! Classification never fails. A payload that is missing a field the action
//! needs, or an event the ledger does not record, is reported as
//! [`Classification::Ignored`] with the reason, and [`classify`] collapses
//! that to `None`.

use crate::ActionRecord;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::debug;

pub mod payloads;

use payloads::{PullRequestDetails, PullRequestPayload, PushPayload};

/// Number of commit SHA characters kept as the push request id
pub const PUSH_REQUEST_ID_LEN: usize = 8;

const BRANCH_REF_PREFIX: &str = "refs/heads/";

// ============================================================================
// Event Types
// ============================================================================

/// Value of the `X-GitHub-Event` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    Push,
    PullRequest,
    /// Sent once by GitHub when a hook is created
    Ping,
    Other(String),
}

impl EventType {
    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull_request",
            Self::Ping => "ping",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "push" => Self::Push,
            "pull_request" => Self::PullRequest,
            "ping" => Self::Ping,
            other => Self::Other(other.to_string()),
        }
    }
}

// ============================================================================
// Classification Result
// ============================================================================

/// Outcome of classifying one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Record(ActionRecord),
    Ignored(IgnoreReason),
}

impl Classification {
    /// Convert into the record, dropping the ignore reason
    pub fn into_record(self) -> Option<ActionRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Ignored(_) => None,
        }
    }
}

/// Why a delivery produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event type the ledger does not record
    UnsupportedEvent(String),
    /// Pull request action other than opened or merged
    UnhandledAction(String),
    /// A field the action needs is absent or null
    MissingField(&'static str),
    /// The payload does not match the expected shape
    MalformedPayload(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedEvent(event) => write!(f, "unsupported event type '{}'", event),
            Self::UnhandledAction(action) => {
                write!(f, "pull request action '{}' is not recorded", action)
            }
            Self::MissingField(field) => write!(f, "missing field '{}'", field),
            Self::MalformedPayload(message) => write!(f, "malformed payload: {}", message),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classify a delivery, stamping the record with the current UTC time.
///
/// Returns `None` when the delivery is not one of the recorded actions.
pub fn classify(event_type: &str, payload: &Value) -> Option<ActionRecord> {
    classify_at(event_type, payload, Utc::now())
}

/// Classify a delivery, stamping the record with `now`.
pub fn classify_at(event_type: &str, payload: &Value, now: DateTime<Utc>) -> Option<ActionRecord> {
    let classification = evaluate(&EventType::from(event_type), payload, now);
    if let Classification::Ignored(reason) = &classification {
        debug!(
            event_type = %event_type,
            reason = %reason,
            "Webhook delivery not recorded"
        );
    }
    classification.into_record()
}

/// Classify a delivery and keep the reason when it is not recorded.
pub fn evaluate(event_type: &EventType, payload: &Value, now: DateTime<Utc>) -> Classification {
    let result = match event_type {
        EventType::Push => classify_push(payload, now),
        EventType::PullRequest => classify_pull_request(payload, now),
        EventType::Ping | EventType::Other(_) => {
            Err(IgnoreReason::UnsupportedEvent(event_type.to_string()))
        }
    };

    match result {
        Ok(record) => Classification::Record(record),
        Err(reason) => Classification::Ignored(reason),
    }
}

fn classify_push(payload: &Value, now: DateTime<Utc>) -> Result<ActionRecord, IgnoreReason> {
    let push: PushPayload = parse_payload(payload)?;

    let author = push
        .pusher
        .and_then(|p| p.name)
        .ok_or(IgnoreReason::MissingField("pusher.name"))?;
    let git_ref = push.git_ref.ok_or(IgnoreReason::MissingField("ref"))?;

    let request_id = push
        .head_commit
        .and_then(|c| c.id)
        .map(|sha| sha.chars().take(PUSH_REQUEST_ID_LEN).collect::<String>())
        .unwrap_or_default();

    Ok(ActionRecord::push(
        author,
        branch_from_ref(&git_ref),
        request_id,
        now,
    ))
}

fn classify_pull_request(
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<ActionRecord, IgnoreReason> {
    let event: PullRequestPayload = parse_payload(payload)?;

    let action = event.action.ok_or(IgnoreReason::MissingField("action"))?;
    let pr = event
        .pull_request
        .ok_or(IgnoreReason::MissingField("pull_request"))?;

    // Merged is a closed pull request, so it must be checked first.
    if action == "closed" && pr.merged == Some(true) {
        let author = pr
            .merged_by
            .as_ref()
            .and_then(|a| a.login.clone())
            .ok_or(IgnoreReason::MissingField("pull_request.merged_by.login"))?;
        let (from, to, request_id) = branches_and_number(&pr)?;
        return Ok(ActionRecord::merge(author, from, to, request_id, now));
    }

    if action == "opened" {
        let author = pr
            .user
            .as_ref()
            .and_then(|a| a.login.clone())
            .ok_or(IgnoreReason::MissingField("pull_request.user.login"))?;
        let (from, to, request_id) = branches_and_number(&pr)?;
        return Ok(ActionRecord::pull_request(author, from, to, request_id, now));
    }

    Err(IgnoreReason::UnhandledAction(action))
}

fn branches_and_number(pr: &PullRequestDetails) -> Result<(String, String, String), IgnoreReason> {
    let from = pr
        .head
        .as_ref()
        .and_then(|b| b.name.clone())
        .ok_or(IgnoreReason::MissingField("pull_request.head.ref"))?;
    let to = pr
        .base
        .as_ref()
        .and_then(|b| b.name.clone())
        .ok_or(IgnoreReason::MissingField("pull_request.base.ref"))?;
    let number = pr
        .number
        .ok_or(IgnoreReason::MissingField("pull_request.number"))?;

    Ok((from, to, number.to_string()))
}

fn parse_payload<T>(payload: &Value) -> Result<T, IgnoreReason>
where
    T: DeserializeOwned,
{
    T::deserialize(payload).map_err(|e| IgnoreReason::MalformedPayload(e.to_string()))
}

/// Branch name for a pushed ref.
///
/// `refs/heads/<path>` yields the last path segment; any other ref (tags,
/// notes) is returned unchanged.
pub fn branch_from_ref(git_ref: &str) -> String {
    match git_ref.strip_prefix(BRANCH_REF_PREFIX) {
        Some(branch) => branch.rsplit('/').next().unwrap_or(branch).to_string(),
        None => git_ref.to_string(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
