//! # Action Ledger HTTP Service
//!
//! HTTP server that records GitHub repository activity and serves it back to
//! a small activity feed page.
//!
//! This service provides:
//! - `POST /webhook`: classify a GitHub delivery and store the resulting record
//! - `GET /api/actions`: the 50 most recent records, newest first
//! - `GET /`: the activity feed page
//! - `GET /health`, `POST /setup-database` and `GET /metrics` for operators

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use self::config::{DatabaseConfig, LoggingConfig, ServerConfig, ServiceConfig};
pub use errors::{ApiError, ConfigError, ServiceError};
pub use metrics::{ServiceMetrics, WebhookOutcome};
pub use responses::{
    ActionView, HealthResponse, IgnoredResponse, SetupDatabaseResponse, WebhookResponse,
};

use action_ledger_core::storage::{table_ddl, RECENT_ACTIONS_LIMIT};
use action_ledger_core::{webhook, ActionStore};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::cmp::Reverse;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, instrument, warn};

/// Header carrying the GitHub event name
pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

/// Header used to correlate log lines for one request
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const INDEX_HTML: &str = include_str!("../static/index.html");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Record store for inserting and reading actions
    pub store: Arc<dyn ActionStore>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn ActionStore>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let mut router = Router::new()
        .route("/", get(handle_index))
        .route("/webhook", post(handle_webhook))
        .route("/api/actions", get(handle_list_actions))
        .route("/health", get(handle_health_check))
        .route("/setup-database", post(handle_setup_database))
        .route("/metrics", get(metrics_endpoint))
        .layer(DefaultBodyLimit::max(server.max_body_size));

    if server.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    if server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start HTTP server and run until a shutdown signal arrives
pub async fn start_server(
    config: ServiceConfig,
    store: Arc<dyn ActionStore>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config.clone(), store, metrics);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let shutdown_started = Arc::new(Notify::new());
    let notify = shutdown_started.clone();

    // In-flight requests finish after the signal; new connections are refused.
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_timeout).await;
            notify.notify_one();
        })
        .into_future();

    let drain_deadline = async {
        shutdown_started.notified().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
        },
    }
}

// ============================================================================
// Page Handler
// ============================================================================

/// Activity feed page
async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle GitHub webhook deliveries
///
/// 1. Reject an absent, empty or non-JSON body with 400
/// 2. Classify the delivery by its `X-GitHub-Event` header and payload
/// 3. Store the record, or answer `ignored` when nothing applies
#[instrument(skip(state, headers, body), fields(event_type))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event_type = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(event) = &event_type {
        tracing::Span::current().record("event_type", event.as_str());
    }

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            state.metrics.record_webhook(WebhookOutcome::Rejected);
            return Err(e);
        }
    };

    let record = event_type
        .as_deref()
        .and_then(|event| webhook::classify(event, &payload));

    let Some(record) = record else {
        debug!(event_type = ?event_type, "Webhook delivery ignored");
        state.metrics.record_webhook(WebhookOutcome::Ignored);
        return Ok(Json(IgnoredResponse::new(event_type)).into_response());
    };

    match state.store.insert(&record).await {
        Ok(stored) => {
            info!(
                id = stored.id,
                action = %stored.action,
                author = %stored.author,
                "Stored action"
            );
            state.metrics.record_webhook(WebhookOutcome::Stored);
            Ok(Json(WebhookResponse::success(stored)).into_response())
        }
        Err(e) => {
            state.metrics.record_webhook(WebhookOutcome::Failed);
            state.metrics.record_storage_failure("insert");
            Err(ApiError::Storage(e))
        }
    }
}

/// Decode the request body, treating falsy JSON (`null`, `false`, `0`, `""`,
/// `{}`, `[]`) as absent
fn parse_payload(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::EmptyPayload);
    }

    let payload: Value = serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson {
        message: e.to_string(),
    })?;

    let empty = match &payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
    };

    if empty {
        Err(ApiError::EmptyPayload)
    } else {
        Ok(payload)
    }
}

// ============================================================================
// Activity Feed Handler
// ============================================================================

/// Most recent actions, newest first, each with a display timestamp
#[instrument(skip(state))]
async fn handle_list_actions(State(state): State<AppState>) -> Result<Json<Vec<ActionView>>, ApiError> {
    let mut actions = state
        .store
        .list_recent(RECENT_ACTIONS_LIMIT)
        .await
        .inspect_err(|_| state.metrics.record_storage_failure("list"))?;

    // Rows with an unrecognized timestamp sort last
    actions.sort_by_cached_key(|a| Reverse(a.timestamp.parsed()));
    actions.truncate(RECENT_ACTIONS_LIMIT);

    Ok(Json(actions.into_iter().map(ActionView::from).collect()))
}

// ============================================================================
// Health and Setup Handlers
// ============================================================================

/// Health check backed by a live row count
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.store.count().await {
        Ok(total) => (StatusCode::OK, Json(HealthResponse::healthy(total))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            state.metrics.record_storage_failure("count");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse::unhealthy(e.to_string())),
            )
        }
    }
}

/// Report whether the record table exists, with its DDL when it does not
#[instrument(skip(state))]
async fn handle_setup_database(State(state): State<AppState>) -> Json<SetupDatabaseResponse> {
    match state.store.list_recent(1).await {
        Ok(_) => Json(SetupDatabaseResponse::table_exists()),
        Err(e) => {
            warn!(error = %e, "Record table is not queryable");
            Json(SetupDatabaseResponse::create_table(table_ddl(
                &state.config.database.table,
            )))
        }
    }
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let body = state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses an incoming `x-correlation-id` or generates one, logs request start
/// and completion, and echoes the id on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());

    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Records request count by method and status, and request duration
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;

    state
        .metrics
        .record_http_request(method.as_str(), response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
