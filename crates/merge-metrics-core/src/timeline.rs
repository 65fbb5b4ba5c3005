//! Ready-for-review resolution from a pull request's issue timeline.

use crate::{RepoName, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Timeline event kind marking a draft as ready for review
pub const READY_FOR_REVIEW_EVENT: &str = "ready_for_review";

/// One entry of the issue timeline.
///
/// Only the fields the resolver needs are modelled; several event kinds
/// (e.g. `committed`) carry no `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Outcome of resolving when a pull request became ready for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyResolution {
    /// A ready-for-review transition was observed at this time
    Found(DateTime<Utc>),
    /// The timeline was read and holds no ready-for-review transition
    NeverDrafted,
    /// The timeline could not be read
    Unknown,
}

impl ReadyResolution {
    /// Resolve from timeline events in API order (oldest first).
    ///
    /// The newest `ready_for_review` event wins.
    pub fn from_events(events: &[TimelineEvent]) -> Self {
        events
            .iter()
            .rev()
            .filter(|e| e.event == READY_FOR_REVIEW_EVENT)
            .find_map(|e| e.created_at)
            .map(Self::Found)
            .unwrap_or(Self::NeverDrafted)
    }

    /// Ready time, falling back to `opened_at` when no transition is known
    pub fn ready_at_or(&self, opened_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Found(ts) => *ts,
            Self::NeverDrafted | Self::Unknown => opened_at,
        }
    }

    /// True iff a ready-for-review transition was observed
    pub fn was_draft(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Source of pull request timeline events
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Fetch every timeline event for the pull request, oldest first
    async fn fetch_timeline(
        &self,
        repo: &RepoName,
        pr_number: u64,
    ) -> Result<Vec<TimelineEvent>, SourceError>;
}

/// Resolve the ready-for-review time, absorbing source failures.
///
/// Failures yield [`ReadyResolution::Unknown`] and are logged at WARN.
pub async fn resolve_ready_at(
    source: &dyn TimelineSource,
    repo: &RepoName,
    pr_number: u64,
) -> ReadyResolution {
    match source.fetch_timeline(repo, pr_number).await {
        Ok(events) => {
            let resolution = ReadyResolution::from_events(&events);
            debug!(
                repo = %repo,
                pr_number = pr_number,
                events = events.len(),
                resolution = ?resolution,
                "Resolved ready-for-review time"
            );
            resolution
        }
        Err(e) => {
            warn!(
                repo = %repo,
                pr_number = pr_number,
                error = %e,
                transient = e.is_transient(),
                "Timeline lookup failed, ready time unknown"
            );
            ReadyResolution::Unknown
        }
    }
}

#[cfg(test)]
#[path = "timeline_tests.rs"]
mod tests;
