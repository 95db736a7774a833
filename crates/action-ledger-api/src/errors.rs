//! Error types for the HTTP service

use action_ledger_core::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

/// Handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the request body is absent, empty or not JSON
/// - `500 Internal Server Error`: the record store failed; the store's message
///   is echoed so operators can see auth or schema problems from the caller side
///
/// The body is always `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable payload in the request body
    #[error("No payload received")]
    EmptyPayload,

    /// Request body is not valid JSON
    #[error("Invalid JSON payload: {message}")]
    InvalidJson { message: String },

    /// Record store failure
    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyPayload | Self::InvalidJson { .. } => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::Storage(e) => {
                error!(error = %e, transient = e.is_transient(), "Record store operation failed");
            }
            Self::EmptyPayload | Self::InvalidJson { .. } => {
                warn!(error = %self, "Rejected webhook payload");
            }
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}
