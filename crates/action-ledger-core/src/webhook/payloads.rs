//! Payload schemas for the GitHub events the ledger understands.
//!
//! Only the fields the classifier reads are declared, and every one of them is
//! optional: GitHub omits or nulls fields depending on the event (a branch
//! deletion push has a `null` head commit, for example), and an absent field
//! must degrade to "not applicable" rather than fail the request.

use serde::Deserialize;

// ============================================================================
// Push Events
// ============================================================================

/// Push event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    /// Git ref that was pushed (e.g., "refs/heads/main")
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,

    /// Account that performed the push
    pub pusher: Option<Pusher>,

    /// The most recent commit of the push
    pub head_commit: Option<HeadCommit>,
}

/// Pusher identity. Pushes report a git name, not a login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pusher {
    pub name: Option<String>,
}

/// Head commit of a push
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    /// Commit SHA
    pub id: Option<String>,
}

// ============================================================================
// Pull Request Events
// ============================================================================

/// Pull request event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    /// Action that triggered this event ("opened", "closed", ...)
    pub action: Option<String>,

    /// Pull request details
    pub pull_request: Option<PullRequestDetails>,
}

/// The subset of a pull request object used for classification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestDetails {
    pub number: Option<u64>,
    pub user: Option<Account>,
    pub merged: Option<bool>,
    pub merged_by: Option<Account>,
    pub head: Option<BranchRef>,
    pub base: Option<BranchRef>,
}

/// GitHub account reference
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    pub login: Option<String>,
}

/// Head or base side of a pull request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchRef {
    /// Branch name
    #[serde(rename = "ref")]
    pub name: Option<String>,
}
