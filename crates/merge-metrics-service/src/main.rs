//! # Merge-Metrics Service
//!
//! Binary entry point for the Merge-Metrics HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the metric store, upstream clients and deriver
//! - Starts the HTTP server from merge-metrics-api

mod settings;
mod wiring;

use merge_metrics_api::{start_server, AppState, LoggingConfig, ServiceError, ServiceMetrics};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::var(settings::CONFIG_FILE_ENV).ok();

    let service_config = match settings::load_config(explicit_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    init_tracing(&service_config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Merge-Metrics Service");

    let deriver = match wiring::build_deriver(&service_config).await {
        Ok(deriver) => deriver,
        Err(e) => {
            error!(error = %e, "Failed to build service dependencies; aborting");
            std::process::exit(e.exit_code());
        }
    };

    let metrics = match ServiceMetrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(error = %e, "Failed to initialize metrics; aborting");
            std::process::exit(3);
        }
    };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    let state = AppState::new(service_config, deriver, metrics);

    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) {
    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "merge_metrics_service={level},merge_metrics_api={level},merge_metrics_core={level},tower_http=debug"
        )
        .into()
    });

    let json = logging.json_format;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}
