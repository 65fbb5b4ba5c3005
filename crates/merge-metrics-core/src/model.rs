//! Persisted metric record and the column-level upsert that produces it.
//!
//! A [`PrMetric`] is the single row stored per `(repo, pr_number)`. Every
//! write to the store is expressed as a [`MetricUpsert`]: the identity, the
//! last-known title and author, and an optional value for each remaining
//! column. An unsupplied column keeps whatever the row already holds.

use crate::{MetricKey, RepoName, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

// ============================================================================
// Enumerations
// ============================================================================

/// Fixed five-level priority scale.
///
/// External ticket systems with other vocabularies are mapped onto this scale
/// by [`crate::tickets::map_priority`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Medium,
    High,
    Highest,
}

impl Priority {
    /// All levels, most urgent first
    pub const DESCENDING: [Priority; 5] = [
        Priority::Highest,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Lowest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lowest => "lowest",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest" => Ok(Self::Lowest),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "highest" => Ok(Self::Highest),
            other => Err(ValidationError::InvalidFormat {
                field: "priority".to_string(),
                message: format!("unknown priority '{}'", other),
            }),
        }
    }
}

/// Current status of one review track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 3] = [
        ReviewStatus::Pending,
        ReviewStatus::Approved,
        ReviewStatus::ChangesRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Persisted Record
// ============================================================================

/// One stored row per pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrMetric {
    pub repo: RepoName,
    pub pr_number: u64,
    pub title: String,
    pub author: String,
    pub opened_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub was_draft: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub qa_review: ReviewStatus,
    pub dev_review: ReviewStatus,
    pub jira_ticket: Option<String>,
}

impl PrMetric {
    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.repo.clone(), self.pr_number)
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// Ready-to-merge duration in fractional hours
    pub fn duration_hours(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / MS_PER_HOUR)
    }

    /// Ready-to-merge duration in fractional days
    pub fn duration_days(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / MS_PER_DAY)
    }

    /// Opened-to-merge duration in fractional days
    pub fn open_to_merge_days(&self) -> Option<f64> {
        self.merged_at
            .map(|merged| (merged - self.opened_at).num_milliseconds() as f64 / MS_PER_DAY)
    }
}

// ============================================================================
// Upsert
// ============================================================================

/// Column-level write unit keyed by `(repo, pr_number)`.
///
/// `None` means "not supplied": applying the upsert leaves the stored value
/// untouched, or uses the column default when the row does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpsert {
    pub repo: RepoName,
    pub pr_number: u64,
    pub title: String,
    pub author: String,
    pub opened_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub was_draft: Option<bool>,
    pub ticket: Option<TicketColumns>,
    pub qa_review: Option<ReviewStatus>,
    pub dev_review: Option<ReviewStatus>,
}

/// Ticket-derived columns, always written together.
///
/// A resolved absence (no ticket reference, no due date) overwrites the
/// stored value, so a changed ticket never leaves a stale due date behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketColumns {
    pub jira_ticket: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl MetricUpsert {
    /// Upsert supplying only identity, title, author and `opened_at`
    pub fn new(
        repo: RepoName,
        pr_number: u64,
        title: impl Into<String>,
        author: impl Into<String>,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            repo,
            pr_number,
            title: title.into(),
            author: author.into(),
            opened_at,
            ready_at: None,
            merged_at: None,
            duration_ms: None,
            was_draft: None,
            ticket: None,
            qa_review: None,
            dev_review: None,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.repo.clone(), self.pr_number)
    }

    /// Apply this upsert on top of the existing row, if any.
    ///
    /// Rules:
    /// - `opened_at` and `merged_at` are write-once: an existing value wins.
    /// - Once a row is merged, `ready_at`, `duration_ms` and `was_draft` only
    ///   change through another upsert that also carries `merged_at`. A late
    ///   Opened delivery therefore cannot break the duration of a merged row.
    /// - When the stored `merged_at` wins over a different incoming one,
    ///   `duration_ms` is recomputed against the stored merge time.
    /// - Ticket columns are replaced as a unit when supplied.
    /// - Every other supplied column overwrites; unsupplied columns persist.
    pub fn apply(self, existing: Option<PrMetric>) -> PrMetric {
        let Some(mut row) = existing else {
            let ticket = self.ticket.unwrap_or_default();
            return PrMetric {
                repo: self.repo,
                pr_number: self.pr_number,
                title: self.title,
                author: self.author,
                opened_at: self.opened_at,
                ready_at: self.ready_at,
                merged_at: self.merged_at,
                duration_ms: self.duration_ms,
                was_draft: self.was_draft.unwrap_or(false),
                priority: ticket.priority,
                due_date: ticket.due_date,
                qa_review: self.qa_review.unwrap_or_default(),
                dev_review: self.dev_review.unwrap_or_default(),
                jira_ticket: ticket.jira_ticket,
            };
        };

        let merge_columns_locked = row.merged_at.is_some() && self.merged_at.is_none();

        row.title = self.title;
        row.author = self.author;

        if row.merged_at.is_none() {
            row.merged_at = self.merged_at;
        }
        let stored_merge_won = self.merged_at.is_some() && row.merged_at != self.merged_at;

        if !merge_columns_locked {
            if let Some(ready_at) = self.ready_at {
                row.ready_at = Some(ready_at);
            }
            if let Some(duration_ms) = self.duration_ms {
                row.duration_ms = match (stored_merge_won, row.merged_at, row.ready_at) {
                    (true, Some(merged_at), Some(ready_at)) => {
                        Some((merged_at - ready_at).num_milliseconds())
                    }
                    _ => Some(duration_ms),
                };
            }
            if let Some(was_draft) = self.was_draft {
                row.was_draft = was_draft;
            }
        }

        if let Some(ticket) = self.ticket {
            row.jira_ticket = ticket.jira_ticket;
            row.priority = ticket.priority;
            row.due_date = ticket.due_date;
        }
        if let Some(qa_review) = self.qa_review {
            row.qa_review = qa_review;
        }
        if let Some(dev_review) = self.dev_review {
            row.dev_review = dev_review;
        }

        row
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
