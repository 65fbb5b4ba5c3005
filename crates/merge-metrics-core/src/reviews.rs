//! Review track classification.
//!
//! Reviews from designated reviewers form the `qa` track, all others the
//! `dev` track. Each track reduces to the latest decisive review state.

use crate::model::ReviewStatus;
use crate::{RepoName, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// State of a single submitted review as reported by GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

impl ReviewState {
    /// Status this state decides, or `None` for non-decisive states
    pub fn decisive_status(&self) -> Option<ReviewStatus> {
        match self {
            Self::Approved => Some(ReviewStatus::Approved),
            Self::ChangesRequested => Some(ReviewStatus::ChangesRequested),
            Self::Commented | Self::Dismissed | Self::Pending | Self::Unknown => None,
        }
    }
}

/// One submitted review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: String,
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Configured set of designated (qa) reviewer logins.
///
/// GitHub logins are case-insensitive, so membership ignores case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignatedReviewers {
    logins: HashSet<String>,
}

impl DesignatedReviewers {
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            logins: logins
                .into_iter()
                .map(|l| l.as_ref().trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(&login.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

/// Status of both review tracks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewClassification {
    pub qa: ReviewStatus,
    pub dev: ReviewStatus,
}

/// Reduce reviews (oldest first) to one status per track.
pub fn classify_reviews(
    reviews: &[Review],
    designated: &DesignatedReviewers,
) -> ReviewClassification {
    let latest_decisive = |qa_track: bool| {
        reviews
            .iter()
            .rev()
            .filter(|r| designated.contains(&r.reviewer) == qa_track)
            .find_map(|r| r.state.decisive_status())
            .unwrap_or_default()
    };

    ReviewClassification {
        qa: latest_decisive(true),
        dev: latest_decisive(false),
    }
}

/// Source of submitted pull request reviews
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Fetch every review for the pull request, oldest first
    async fn fetch_reviews(&self, repo: &RepoName, pr_number: u64)
        -> Result<Vec<Review>, SourceError>;
}

/// Fetch and classify reviews; a failed fetch leaves both tracks pending.
pub async fn resolve_reviews(
    source: &dyn ReviewSource,
    repo: &RepoName,
    pr_number: u64,
    designated: &DesignatedReviewers,
) -> ReviewClassification {
    match source.fetch_reviews(repo, pr_number).await {
        Ok(reviews) => classify_reviews(&reviews, designated),
        Err(e) => {
            warn!(
                repo = %repo,
                pr_number = pr_number,
                error = %e,
                "Review lookup failed, both tracks left pending"
            );
            ReviewClassification::default()
        }
    }
}

#[cfg(test)]
#[path = "reviews_tests.rs"]
mod tests;
