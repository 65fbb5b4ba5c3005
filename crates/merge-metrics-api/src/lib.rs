//! # Merge-Metrics HTTP Service
//!
//! HTTP server for receiving GitHub pull request webhooks and serving the
//! derived metrics to the dashboard.
//!
//! This service provides:
//! - GitHub webhook endpoint with signature validation
//! - Metric listing and dashboard aggregate endpoints
//! - Health check and Prometheus endpoints

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    GitHubConfig, JiraConfig, LoggingConfig, ReviewsConfig, ServerConfig, ServiceConfig,
    StorageConfig, WebhookConfig,
};
pub use errors::{ConfigError, QueryError, ServiceError, WebhookHandlerError};
pub use metrics::{ServiceMetrics, WebhookOutcome};
pub use responses::{HealthResponse, MetricListResponse, MetricQueryParams, WebhookResponse};

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use merge_metrics_core::{
    signature::SIGNATURE_HEADER, verify_signature, DashboardSummary, MetricDeriver, MetricStore,
    PrMetric,
};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Turns verified deliveries into store upserts
    pub deriver: Arc<MetricDeriver>,

    /// Store queried by the dashboard endpoints
    pub store: Arc<dyn MetricStore>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create application state; the dashboard reads from the deriver's store
    pub fn new(
        config: ServiceConfig,
        deriver: MetricDeriver,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let store = deriver.store().clone();
        Self {
            config: Arc::new(config),
            deriver: Arc::new(deriver),
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
    let max_body_size = state.config.server.max_body_size;

    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, post(handle_webhook));

    let api_routes = Router::new()
        .route("/api/metrics", get(list_metrics))
        .route("/api/dashboard", get(get_dashboard));

    let observability_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(api_routes)
        .merge(observability_routes)
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::disable())
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and run until SIGINT or SIGTERM
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let server = state.config.server.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .map_err(|e: std::net::AddrParseError| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: format!("server address {}:{}: {}", server.host, server.port, e),
            })
        })?;

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = server.shutdown_timeout_seconds;
    let shutdown_signal = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
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
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout);
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout);
            },
        }
    };

    // In-flight requests finish; new connections are refused once the signal fires
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle GitHub webhook requests
///
/// The signature is checked against the raw body before anything is parsed.
/// Irrelevant or malformed deliveries are acknowledged with `Ignored`; only a
/// store failure produces a server error.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    let started = Instant::now();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if !verify_signature(&body, signature, &state.config.webhooks.secret) {
        state
            .metrics
            .record_webhook(WebhookOutcome::Rejected, started.elapsed());
        return Err(WebhookHandlerError::InvalidSignature);
    }

    match state.deriver.derive(&body).await {
        Ok(outcome) => {
            let response = WebhookResponse::from(outcome);
            let label = match response {
                WebhookResponse::Recorded { .. } => WebhookOutcome::Recorded,
                WebhookResponse::Ignored { .. } => WebhookOutcome::Ignored,
            };
            state.metrics.record_webhook(label, started.elapsed());
            Ok(Json(response))
        }
        Err(e) => {
            state
                .metrics
                .record_webhook(WebhookOutcome::Failed, started.elapsed());
            Err(WebhookHandlerError::from(e))
        }
    }
}

// ============================================================================
// Dashboard API Handlers
// ============================================================================

/// List stored metrics matching the filters
#[instrument(skip(state))]
pub async fn list_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricQueryParams>,
) -> Result<Json<MetricListResponse>, QueryError> {
    state.metrics.record_api_request("metrics");

    let (query, records) = run_query(&state, params, today()).await?;

    Ok(Json(MetricListResponse {
        from: query.from,
        to: query.to,
        total: records.len(),
        records,
    }))
}

/// Every dashboard aggregate over the metrics matching the filters
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<MetricQueryParams>,
) -> Result<Json<DashboardSummary>, QueryError> {
    state.metrics.record_api_request("dashboard");

    let today = today();
    let (query, records) = run_query(&state, params, today).await?;
    let summary = DashboardSummary::build(&records, today);

    if !query.has_attribute_filters() {
        return Ok(Json(summary));
    }

    // Filter choices cover the whole date range, not just the current selection
    let option_rows = state
        .store
        .query(&query.date_range_only())
        .await
        .inspect_err(|_| {
            state.metrics.record_store_failure();
        })?;

    Ok(Json(summary.with_filter_options(&option_rows)))
}

async fn run_query(
    state: &AppState,
    params: MetricQueryParams,
    today: NaiveDate,
) -> Result<(merge_metrics_core::MetricQuery, Vec<PrMetric>), QueryError> {
    let query = params.into_query(today);

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(QueryError::InvalidQuery {
                message: format!("from ({}) is after to ({})", from, to),
            });
        }
    }

    let records = state.store.query(&query).await.inspect_err(|_| {
        state.metrics.record_store_failure();
    })?;

    Ok((query, records))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip_all)]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .encode()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
