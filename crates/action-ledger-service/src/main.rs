//! # Action Ledger Service
//!
//! Binary entry point for the Action Ledger HTTP service.
//!
//! This executable:
//! - Loads `.env`, configuration files and environment overrides
//! - Initializes logging
//! - Connects the PostgREST record store
//! - Starts the HTTP server from action-ledger-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error.

use action_ledger_api::{start_server, LoggingConfig, ServiceConfig, ServiceError};
use action_ledger_core::adapters::PostgrestActionStore;
use action_ledger_core::ActionStore;
use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const EXIT_CONFIG_ERROR: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Logging settings come from the configuration, so a configuration that
    // cannot be loaded is reported through a default subscriber.
    // -------------------------------------------------------------------------
    let loaded = ServiceConfig::load();
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&logging)?;

    match &dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment from file"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    info!("Starting Action Ledger Service");

    let service_config = match loaded.and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            error!(
                error = %e,
                "Service configuration is invalid; aborting. \
                 Set SUPABASE_URL and SUPABASE_KEY and restart."
            );
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    debug!(config = ?service_config, "Configuration loaded");

    // -------------------------------------------------------------------------
    // Connect the record store
    // -------------------------------------------------------------------------
    let store = match PostgrestActionStore::new(service_config.database.to_postgrest_config()) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to create record store client; aborting");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    probe_store(&store, &service_config.database.url).await;

    let store: Arc<dyn ActionStore> = Arc::new(store);

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, store).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => EXIT_CONFIG_ERROR,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}

// ============================================================================
// Private helpers
// ============================================================================

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "action_ledger_service={level},action_ledger_api={level},action_ledger_core={level},tower_http=debug",
            level = logging.level
        ))
        .with_context(|| format!("Invalid logging level '{}'", logging.level))?,
    };

    let fmt_layer = if logging.json_format {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")
}

/// Check connectivity once at startup. Failures are reported, not fatal.
async fn probe_store(store: &PostgrestActionStore, url: &str) {
    match store.count().await {
        Ok(total) => info!(
            url = %url,
            total_actions = total,
            "Record store connection successful"
        ),
        Err(e) => warn!(
            url = %url,
            error = %e,
            "Record store connection failed; check SUPABASE_URL and SUPABASE_KEY"
        ),
    }
}
