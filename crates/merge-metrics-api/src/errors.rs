//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use merge_metrics_core::{DeriveError, StoreError};
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// - `401 Unauthorized`: the signature header is missing or does not match;
///   nothing was processed.
/// - `500 Internal Server Error`: the metric store rejected the upsert.
///
/// Response bodies carry a fixed message; details stay in the server log.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Metric derivation failed: {0}")]
    Derive(#[from] DeriveError),
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidSignature => {
                warn!("Rejected webhook with invalid signature");
                (StatusCode::UNAUTHORIZED, "Invalid signature")
            }
            Self::Derive(e) => {
                error!(error = %e, transient = e.is_transient(), "Failed to store metric");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Errors from the dashboard query endpoints
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Store query failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Store(e) => {
                error!(error = %e, "Metric query failed");
                let status = if e.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, "Database error".to_string())
            }
            Self::InvalidQuery { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
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

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}
