//! Common test utilities for merge-metrics-api integration tests
//!
//! This module provides:
//! - Stub upstream sources (timeline, reviews, tickets) with call counters
//! - Helpers for signed webhook requests and pull request payloads
//! - An [`AppState`] builder backed by an in-memory store

use axum::http::{HeaderMap, HeaderValue};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use merge_metrics_api::{AppState, ServiceConfig, ServiceMetrics};
use merge_metrics_core::{
    adapters::InMemoryMetricStore,
    reviews::{Review, ReviewState},
    signature::{sign_payload, SIGNATURE_HEADER},
    timeline::{TimelineEvent, READY_FOR_REVIEW_EVENT},
    tickets::{TicketFields, TicketSource},
    DesignatedReviewers, MetricDeriver, RepoName, ReviewSource, SecretValue, SourceError,
    TicketEnricher, TimelineSource,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "integration-secret";

#[allow(dead_code)]
pub const QA_REVIEWER: &str = "qa-lead";

// ============================================================================
// Stub sources
// ============================================================================

/// Timeline source returning a configurable ready-for-review time
#[derive(Default)]
pub struct StubTimeline {
    ready_at: Mutex<Option<DateTime<Utc>>>,
    pub calls: AtomicUsize,
}

impl StubTimeline {
    #[allow(dead_code)]
    pub fn set_ready_at(&self, ready_at: DateTime<Utc>) {
        *self.ready_at.lock().unwrap() = Some(ready_at);
    }
}

#[async_trait::async_trait]
impl TimelineSource for StubTimeline {
    async fn fetch_timeline(
        &self,
        _repo: &RepoName,
        _pr_number: u64,
    ) -> Result<Vec<TimelineEvent>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut events = vec![TimelineEvent {
            event: "labeled".to_string(),
            created_at: None,
        }];
        if let Some(ready_at) = *self.ready_at.lock().unwrap() {
            events.push(TimelineEvent {
                event: READY_FOR_REVIEW_EVENT.to_string(),
                created_at: Some(ready_at),
            });
        }
        Ok(events)
    }
}

/// Review source returning a fixed list, or failing when unset
#[derive(Default)]
pub struct StubReviews {
    reviews: Mutex<Option<Vec<Review>>>,
}

impl StubReviews {
    #[allow(dead_code)]
    pub fn set_reviews(&self, reviews: Vec<(&str, ReviewState)>) {
        *self.reviews.lock().unwrap() = Some(
            reviews
                .into_iter()
                .map(|(reviewer, state)| Review {
                    reviewer: reviewer.to_string(),
                    state,
                    submitted_at: None,
                })
                .collect(),
        );
    }
}

#[async_trait::async_trait]
impl ReviewSource for StubReviews {
    async fn fetch_reviews(
        &self,
        _repo: &RepoName,
        _pr_number: u64,
    ) -> Result<Vec<Review>, SourceError> {
        self.reviews
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::HttpStatus {
                service: "github",
                status: 502,
                message: "bad gateway".to_string(),
            })
    }
}

/// Ticket source knowing a single ticket
pub struct StubTickets {
    pub key: String,
    pub fields: TicketFields,
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl TicketSource for StubTickets {
    async fn fetch_ticket(&self, key: &str) -> Result<Option<TicketFields>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((key == self.key).then(|| self.fields.clone()))
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Handles on every collaborator behind a test [`AppState`]
#[allow(dead_code)]
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<InMemoryMetricStore>,
    pub timeline: Arc<StubTimeline>,
    pub reviews: Arc<StubReviews>,
    pub tickets: Arc<StubTickets>,
}

pub fn create_test_context() -> TestContext {
    let store = Arc::new(InMemoryMetricStore::new());
    let timeline = Arc::new(StubTimeline::default());
    let reviews = Arc::new(StubReviews::default());
    let tickets = Arc::new(StubTickets {
        key: "KP-100".to_string(),
        fields: TicketFields {
            priority_name: Some("Critical".to_string()),
            due_date: Some("2024-05-10".to_string()),
        },
        calls: AtomicUsize::new(0),
    });

    let deriver = MetricDeriver::new(store.clone())
        .with_timeline_source(timeline.clone())
        .with_review_source(reviews.clone(), DesignatedReviewers::new([QA_REVIEWER]))
        .with_ticket_enricher(TicketEnricher::new(tickets.clone()));

    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretValue::new(WEBHOOK_SECRET);

    let metrics = ServiceMetrics::new().expect("metrics registry");

    TestContext {
        state: AppState::new(config, deriver, metrics),
        store,
        timeline,
        reviews,
        tickets,
    }
}

// ============================================================================
// Payload helpers
// ============================================================================

pub fn repo() -> RepoName {
    RepoName::new("octo-org", "widgets").unwrap()
}

/// Pull request delivery for `action`
pub fn pull_request_event(
    action: &str,
    number: u64,
    created_at: &str,
    merged_at: Option<&str>,
    draft: bool,
    body: Option<&str>,
) -> Value {
    json!({
        "action": action,
        "pull_request": {
            "number": number,
            "title": format!("PR {}", number),
            "user": { "login": "alice" },
            "created_at": created_at,
            "merged_at": merged_at,
            "merged": merged_at.is_some(),
            "draft": draft,
            "body": body
        },
        "repository": {
            "full_name": "octo-org/widgets",
            "name": "widgets",
            "owner": { "login": "octo-org" }
        }
    })
}

/// Body bytes plus headers carrying a valid signature for them
pub fn signed(payload: &Value) -> (HeaderMap, Bytes) {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = sign_payload(&body, &SecretValue::new(WEBHOOK_SECRET)).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-github-event", HeaderValue::from_static("pull_request"));
    headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());

    (headers, Bytes::from(body))
}
