//! # Metric Store
//!
//! Upsert-capable persistence for [`PrMetric`] rows keyed by
//! `(repo, pr_number)`.
//!
//! Implementations apply one [`MetricUpsert`] per call using
//! [`MetricUpsert::apply`] semantics and never delete rows. Concurrent
//! writers race with last-write-wins semantics.
//!
//! ## Shipped implementations
//!
//! - [`crate::adapters::InMemoryMetricStore`] for tests and ephemeral runs
//! - [`crate::adapters::FilesystemMetricStore`] keeping the table in one JSON file

use crate::model::{MetricUpsert, Priority, PrMetric};
use crate::RepoName;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Length of the default dashboard window, counted back from today
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

// ============================================================================
// Store contract
// ============================================================================

/// Persistence contract for metric rows
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Insert or update the row for the upsert's identity.
    ///
    /// Returns the row as stored after the write.
    async fn upsert(&self, upsert: MetricUpsert) -> Result<PrMetric, StoreError>;

    /// Fetch a single row by identity
    async fn get(&self, repo: &RepoName, pr_number: u64) -> Result<Option<PrMetric>, StoreError>;

    /// Rows matching the query, ordered by `merged_at` ascending
    async fn query(&self, query: &MetricQuery) -> Result<Vec<PrMetric>, StoreError>;
}

// ============================================================================
// Query
// ============================================================================

/// Filter over stored rows.
///
/// `from`/`to` bound the calendar date (UTC) of `opened_at`, both inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub author: Option<String>,
    pub repo: Option<String>,
    pub priority: Option<Priority>,
}

impl MetricQuery {
    /// Query covering the trailing [`DEFAULT_WINDOW_DAYS`] ending on `today`
    pub fn default_window(today: NaiveDate) -> Self {
        Self {
            from: Some(today - Duration::days(DEFAULT_WINDOW_DAYS)),
            to: Some(today),
            ..Self::default()
        }
    }

    /// Fill any missing date bound from the default window
    pub fn with_default_window(mut self, today: NaiveDate) -> Self {
        let window = Self::default_window(today);
        self.from = self.from.or(window.from);
        self.to = self.to.or(window.to);
        self
    }

    /// Same date bounds without the author, repository and priority filters
    pub fn date_range_only(&self) -> Self {
        Self {
            from: self.from,
            to: self.to,
            ..Self::default()
        }
    }

    /// Whether any filter beyond the date bounds is set
    pub fn has_attribute_filters(&self) -> bool {
        self.author.is_some() || self.repo.is_some() || self.priority.is_some()
    }

    pub fn matches(&self, metric: &PrMetric) -> bool {
        let opened = metric.opened_at.date_naive();

        if self.from.is_some_and(|from| opened < from) {
            return false;
        }
        if self.to.is_some_and(|to| opened > to) {
            return false;
        }
        if let Some(author) = &self.author {
            if &metric.author != author {
                return false;
            }
        }
        if let Some(repo) = &self.repo {
            if &metric.repo.full_name() != repo {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if metric.priority != priority {
                return false;
            }
        }

        true
    }
}

/// Query result order: merged first by `merged_at`, then unmerged, ties by identity.
pub fn query_order(a: &PrMetric, b: &PrMetric) -> Ordering {
    let by_merge = match (a.merged_at, b.merged_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_merge
        .then_with(|| a.repo.cmp(&b.repo))
        .then_with(|| a.pr_number.cmp(&b.pr_number))
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during metric store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed
    #[error("Storage I/O failed: {message}")]
    Io { message: String },

    /// Stored data could not be serialized or parsed
    #[error("Serialization failed: {message}")]
    SerializationFailed { message: String },

    /// Store is not reachable
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal store error: {message}")]
    InternalError { message: String },
}

impl StoreError {
    /// Check if error is transient and a redelivery may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Unavailable { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationFailed {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
