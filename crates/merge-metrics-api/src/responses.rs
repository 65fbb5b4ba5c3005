//! Response types and query parameters for the API.

use chrono::NaiveDate;
use merge_metrics_core::{DeriveOutcome, MetricQuery, Priority, PrMetric};
use serde::{Deserialize, Serialize};

// ============================================================================
// Response Types
// ============================================================================

/// Webhook processing response, tagged by `message`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message")]
pub enum WebhookResponse {
    Recorded {
        repo: String,
        pr_number: u64,
        duration_ms: Option<i64>,
    },
    Ignored {
        reason: String,
    },
}

impl From<DeriveOutcome> for WebhookResponse {
    fn from(outcome: DeriveOutcome) -> Self {
        match outcome {
            DeriveOutcome::Recorded(recorded) => Self::Recorded {
                repo: recorded.repo().full_name(),
                pr_number: recorded.pr_number(),
                duration_ms: recorded.duration_ms(),
            },
            DeriveOutcome::Ignored { reason } => Self::Ignored { reason },
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Metric list response
#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total: usize,
    pub records: Vec<PrMetric>,
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Filters accepted by `/api/metrics` and `/api/dashboard`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricQueryParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub author: Option<String>,
    pub repo: Option<String>,
    pub priority: Option<Priority>,
}

impl MetricQueryParams {
    /// Store query with missing date bounds taken from the default window
    pub fn into_query(self, today: NaiveDate) -> MetricQuery {
        MetricQuery {
            from: self.from,
            to: self.to,
            author: self.author.filter(|a| !a.is_empty()),
            repo: self.repo.filter(|r| !r.is_empty()),
            priority: self.priority,
        }
        .with_default_window(today)
    }
}
