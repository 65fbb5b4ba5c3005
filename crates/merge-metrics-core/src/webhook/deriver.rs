//! Metric derivation: turns one pull request delivery into one upsert.

use super::{PullRequestEvent, PullRequestPayload, Transition};
use crate::model::{MetricUpsert, PrMetric, TicketColumns};
use crate::reviews::{resolve_reviews, DesignatedReviewers, ReviewClassification, ReviewSource};
use crate::store::{MetricStore, StoreError};
use crate::tickets::{extract_ticket_ref, TicketCache, TicketDetails, TicketEnricher};
use crate::timeline::{resolve_ready_at, ReadyResolution, TimelineSource};
use crate::RepoName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ============================================================================
// Outcome and error types
// ============================================================================

/// Row written for a recorded delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedMetric {
    pub transition: Transition,
    pub metric: PrMetric,
}

impl RecordedMetric {
    pub fn repo(&self) -> &RepoName {
        &self.metric.repo
    }

    pub fn pr_number(&self) -> u64 {
        self.metric.pr_number
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.metric.duration_ms
    }
}

/// Result of handling one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum DeriveOutcome {
    /// Exactly one upsert was written
    Recorded(RecordedMetric),
    /// Nothing was written
    Ignored { reason: String },
}

/// Failures that abort a delivery.
///
/// Upstream source failures never surface here; they degrade to fallbacks.
#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error("Metric store failed: {0}")]
    Store(#[from] StoreError),
}

impl DeriveError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
        }
    }
}

// ============================================================================
// Deriver
// ============================================================================

/// Orchestrates timeline, review and ticket lookups into store upserts.
///
/// Every upstream source is optional; an absent source behaves like a source
/// that returned no data.
#[derive(Clone)]
pub struct MetricDeriver {
    store: Arc<dyn MetricStore>,
    timeline: Option<Arc<dyn TimelineSource>>,
    reviews: Option<Arc<dyn ReviewSource>>,
    tickets: Option<TicketEnricher>,
    designated: DesignatedReviewers,
}

impl MetricDeriver {
    /// Create deriver writing to `store` with no upstream sources
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            store,
            timeline: None,
            reviews: None,
            tickets: None,
            designated: DesignatedReviewers::default(),
        }
    }

    pub fn with_timeline_source(mut self, source: Arc<dyn TimelineSource>) -> Self {
        self.timeline = Some(source);
        self
    }

    pub fn with_review_source(
        mut self,
        source: Arc<dyn ReviewSource>,
        designated: DesignatedReviewers,
    ) -> Self {
        self.reviews = Some(source);
        self.designated = designated;
        self
    }

    pub fn with_ticket_enricher(mut self, enricher: TicketEnricher) -> Self {
        self.tickets = Some(enricher);
        self
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    /// Handle a raw webhook body.
    ///
    /// Unparsable bodies are ignored rather than rejected.
    #[instrument(skip(self, raw_body), fields(body_len = raw_body.len()))]
    pub async fn derive(&self, raw_body: &[u8]) -> Result<DeriveOutcome, DeriveError> {
        match PullRequestEvent::from_slice(raw_body) {
            Ok(event) => self.derive_event(&event).await,
            Err(e) => {
                info!(error = %e, "Ignoring unparsable webhook body");
                Ok(DeriveOutcome::Ignored {
                    reason: format!("unparsable payload: {}", e),
                })
            }
        }
    }

    /// Handle a parsed delivery with a ticket cache scoped to this delivery.
    pub async fn derive_event(&self, event: &PullRequestEvent) -> Result<DeriveOutcome, DeriveError> {
        let classified = match event.classify() {
            Ok(classified) => classified,
            Err(reason) => {
                info!(action = %event.action, reason = %reason, "Ignoring webhook delivery");
                return Ok(DeriveOutcome::Ignored { reason });
            }
        };

        let repo = &classified.repo;
        let pr = classified.pull_request;
        let cache = TicketCache::new();

        let upsert = match classified.transition {
            Transition::Opened => self.opened_upsert(repo, pr, &cache).await,
            Transition::Merged { merged_at } => {
                self.merged_upsert(repo, pr, merged_at, &cache).await
            }
        };

        let metric = self.write(upsert).await?;

        info!(
            repo = %repo,
            pr_number = pr.number,
            transition = %classified.transition,
            duration_ms = ?metric.duration_ms,
            "Recorded pull request metric"
        );

        Ok(DeriveOutcome::Recorded(RecordedMetric {
            transition: classified.transition,
            metric,
        }))
    }

    /// Derive and store the current state of a pull request in any state.
    ///
    /// Used when backfilling history. Readiness goes through the timeline;
    /// a draft with no ready-for-review event keeps `ready_at` absent.
    #[instrument(skip(self, pr, cache), fields(pr_number = pr.number))]
    pub async fn record_snapshot(
        &self,
        repo: &RepoName,
        pr: &PullRequestPayload,
        cache: &TicketCache,
    ) -> Result<PrMetric, DeriveError> {
        let resolution = self.resolve_ready(repo, pr.number).await;

        let (ready_at, was_draft) = match resolution {
            ReadyResolution::Found(ts) => (Some(ts), true),
            ReadyResolution::NeverDrafted | ReadyResolution::Unknown if pr.draft => (None, false),
            ReadyResolution::NeverDrafted | ReadyResolution::Unknown => {
                (Some(pr.created_at), false)
            }
        };

        let merged_at = pr.merged_at.filter(|_| pr.is_merged());
        let duration_ms = match (merged_at, ready_at) {
            (Some(merged), Some(ready)) => Some(checked_duration(repo, pr.number, ready, merged)),
            _ => None,
        };

        let reviews = self.resolve_reviews(repo, pr.number).await;
        let (ticket, details) = self.enrich(pr.body.as_deref(), cache).await;

        let mut upsert = base_upsert(repo, pr);
        upsert.ready_at = ready_at;
        upsert.merged_at = merged_at;
        upsert.duration_ms = duration_ms;
        upsert.was_draft = Some(was_draft);
        upsert.qa_review = Some(reviews.qa);
        upsert.dev_review = Some(reviews.dev);
        apply_ticket(&mut upsert, ticket, details);

        self.write(upsert).await
    }

    async fn opened_upsert(
        &self,
        repo: &RepoName,
        pr: &PullRequestPayload,
        cache: &TicketCache,
    ) -> MetricUpsert {
        let mut upsert = base_upsert(repo, pr);

        if !pr.draft {
            upsert.ready_at = Some(pr.created_at);
            upsert.was_draft = Some(false);
        }

        let (ticket, details) = self.enrich(pr.body.as_deref(), cache).await;
        apply_ticket(&mut upsert, ticket, details);

        upsert
    }

    async fn merged_upsert(
        &self,
        repo: &RepoName,
        pr: &PullRequestPayload,
        merged_at: DateTime<Utc>,
        cache: &TicketCache,
    ) -> MetricUpsert {
        let resolution = self.resolve_ready(repo, pr.number).await;
        let ready_at = resolution.ready_at_or(pr.created_at);
        let reviews = self.resolve_reviews(repo, pr.number).await;
        let (ticket, details) = self.enrich(pr.body.as_deref(), cache).await;

        let mut upsert = base_upsert(repo, pr);
        upsert.ready_at = Some(ready_at);
        upsert.merged_at = Some(merged_at);
        upsert.duration_ms = Some(checked_duration(repo, pr.number, ready_at, merged_at));
        upsert.was_draft = Some(resolution.was_draft());
        upsert.qa_review = Some(reviews.qa);
        upsert.dev_review = Some(reviews.dev);
        apply_ticket(&mut upsert, ticket, details);

        upsert
    }

    async fn resolve_ready(&self, repo: &RepoName, pr_number: u64) -> ReadyResolution {
        match &self.timeline {
            Some(source) => resolve_ready_at(source.as_ref(), repo, pr_number).await,
            None => {
                debug!("No timeline source configured");
                ReadyResolution::Unknown
            }
        }
    }

    async fn resolve_reviews(&self, repo: &RepoName, pr_number: u64) -> ReviewClassification {
        match &self.reviews {
            Some(source) => {
                resolve_reviews(source.as_ref(), repo, pr_number, &self.designated).await
            }
            None => ReviewClassification::default(),
        }
    }

    async fn enrich(
        &self,
        body: Option<&str>,
        cache: &TicketCache,
    ) -> (Option<String>, TicketDetails) {
        match &self.tickets {
            Some(enricher) => enricher.enrich_text(body, cache).await,
            None => (extract_ticket_ref(body), TicketDetails::default()),
        }
    }

    async fn write(&self, upsert: MetricUpsert) -> Result<PrMetric, DeriveError> {
        let key = upsert.key();
        self.store.upsert(upsert).await.map_err(|e| {
            error!(
                key = %key,
                error = %e,
                transient = e.is_transient(),
                "Failed to store pull request metric"
            );
            DeriveError::Store(e)
        })
    }
}

fn base_upsert(repo: &RepoName, pr: &PullRequestPayload) -> MetricUpsert {
    MetricUpsert::new(
        repo.clone(),
        pr.number,
        pr.title.clone(),
        pr.author(),
        pr.created_at,
    )
}

fn apply_ticket(upsert: &mut MetricUpsert, ticket: Option<String>, details: TicketDetails) {
    upsert.ticket = Some(TicketColumns {
        jira_ticket: ticket,
        priority: details.priority,
        due_date: details.due_date,
    });
}

/// `merged_at - ready_at` in milliseconds; negative values are kept and logged.
fn checked_duration(
    repo: &RepoName,
    pr_number: u64,
    ready_at: DateTime<Utc>,
    merged_at: DateTime<Utc>,
) -> i64 {
    let duration_ms = (merged_at - ready_at).num_milliseconds();
    if duration_ms < 0 {
        warn!(
            repo = %repo,
            pr_number = pr_number,
            ready_at = %ready_at,
            merged_at = %merged_at,
            duration_ms = duration_ms,
            "Merged before ready for review; negative duration recorded"
        );
    }
    duration_ms
}

#[cfg(test)]
#[path = "deriver_tests.rs"]
mod tests;
