//! Metrics collection for the API service.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// What happened to a webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Classified and inserted
    Stored,
    /// Not one of the recorded actions
    Ignored,
    /// Body absent or not JSON
    Rejected,
    /// Insert failed
    Failed,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Service metrics for observability
///
/// Collectors are registered in a registry owned by this instance, so any
/// number of routers (tests included) can coexist in one process.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: Histogram,

    // Ingestion metrics
    pub webhook_events_total: IntCounterVec,
    pub storage_failures_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "status"],
        )?;
        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        let webhook_events_total = IntCounterVec::new(
            Opts::new("webhook_events_total", "Webhook deliveries by outcome"),
            &["outcome"],
        )?;
        let storage_failures_total = IntCounterVec::new(
            Opts::new("storage_failures_total", "Failed record store operations"),
            &["operation"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(webhook_events_total.clone()))?;
        registry.register(Box::new(storage_failures_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            webhook_events_total,
            storage_failures_total,
        }))
    }

    pub fn record_http_request(&self, method: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
        self.http_request_duration.observe(duration.as_secs_f64());
    }

    pub fn record_webhook(&self, outcome: WebhookOutcome) {
        self.webhook_events_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn record_storage_failure(&self, operation: &str) {
        self.storage_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Current values in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
