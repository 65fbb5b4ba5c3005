//! # Merge-Metrics Core
//!
//! Core business logic for the Merge-Metrics pull request analytics service.
//!
//! This crate turns GitHub pull request webhook events into persisted
//! time-to-merge metrics and aggregates those metrics for the dashboard.
//!
//! ## Architecture
//!
//! The core follows the same layering throughout:
//! - Derivation and aggregation logic depends only on trait abstractions
//!   ([`TimelineSource`], [`ReviewSource`], [`TicketSource`], [`MetricStore`])
//! - HTTP-backed and storage implementations live in [`adapters`] and are
//!   injected at startup
//! - Upstream failures are absorbed at the source boundary; only store
//!   failures propagate to callers
//!
//! ## Usage
//!
//! ```rust
//! use merge_metrics_core::{MetricKey, RepoName};
//!
//! let repo: RepoName = "octo-org/widgets".parse().unwrap();
//! let key = MetricKey::new(repo, 42);
//! assert_eq!(key.to_string(), "octo-org/widgets#42");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Repository identifier in `owner/name` form.
///
/// Forms one half of the natural identity of a [`PrMetric`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName {
    owner: String,
    name: String,
}

impl RepoName {
    /// Create repository name from its two components
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let owner = owner.into();
        let name = name.into();

        for (field, value) in [("repository.owner", &owner), ("repository.name", &name)] {
            if value.is_empty() {
                return Err(ValidationError::Required {
                    field: field.to_string(),
                });
            }
            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(ValidationError::InvalidCharacters {
                    field: field.to_string(),
                    invalid_chars: "'/' or whitespace".to_string(),
                });
            }
        }

        Ok(Self { owner, name })
    }

    /// Repository owner (user or organization login)
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name without the owner
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full `owner/name` form
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s.split_once('/').ok_or_else(|| ValidationError::InvalidFormat {
            field: "repository".to_string(),
            message: format!("expected 'owner/name', got '{}'", s),
        })?;
        Self::new(owner, name)
    }
}

impl TryFrom<String> for RepoName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoName> for String {
    fn from(value: RepoName) -> Self {
        value.full_name()
    }
}

/// Natural identity of a metric row: `(repo, pr_number)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey {
    pub repo: RepoName,
    pub pr_number: u64,
}

impl MetricKey {
    /// Create new metric key
    pub fn new(repo: RepoName, pr_number: u64) -> Self {
        Self { repo, pr_number }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.pr_number)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Failure talking to an upstream data source (GitHub, Jira).
///
/// These never cross the system boundary: the components that call a source
/// convert them into documented fallback values.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP error from {service}: {status} - {message}")]
    HttpStatus {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Request to {service} failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("Could not decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Source configuration error: {message}")]
    Configuration { message: String },
}

impl SourceError {
    /// Check if the failure is transient and a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Transport { .. } => true,
            Self::Decode { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Persisted metric record and upsert semantics
pub mod model;

/// Webhook signature verification
pub mod signature;

/// Ready-for-review resolution from the PR timeline
pub mod timeline;

/// Review track classification
pub mod reviews;

/// Ticket reference extraction and enrichment
pub mod tickets;

/// Webhook payload parsing and metric derivation
pub mod webhook;

/// Metric store contract
pub mod store;

/// Pure aggregation functions for the dashboard
pub mod aggregation;

/// SQL rendering for batch upserts
pub mod sql;

/// HTTP and storage adapters
pub mod adapters;

// Re-export key types for convenience
pub use aggregation::{Aggregate, DashboardSummary};
pub use model::{MetricUpsert, Priority, PrMetric, ReviewStatus, TicketColumns};
pub use reviews::{classify_reviews, DesignatedReviewers, Review, ReviewClassification, ReviewSource};
pub use signature::{verify_signature, SecretValue};
pub use store::{MetricQuery, MetricStore, StoreError};
pub use tickets::{
    extract_ticket_ref, map_priority, TicketCache, TicketDetails, TicketEnricher, TicketSource,
};
pub use timeline::{ReadyResolution, TimelineSource};
pub use webhook::{DeriveError, DeriveOutcome, MetricDeriver, RecordedMetric};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
