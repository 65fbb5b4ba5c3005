//! Prometheus metrics for the API service.
//!
//! Each [`ServiceMetrics`] owns its registry so several instances (one per
//! test, for example) never collide on metric names.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "merge_metrics";

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // Webhook processing metrics
    pub webhook_requests_total: IntCounter,
    pub webhook_outcomes_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub signature_validation_failures: IntCounter,

    // Store metrics
    pub store_failures_total: IntCounter,

    // Dashboard API metrics
    pub api_requests_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)?;

        let webhook_requests_total = IntCounter::new(
            "webhook_requests_total",
            "Total webhook requests received",
        )?;
        let webhook_outcomes_total = IntCounterVec::new(
            Opts::new(
                "webhook_outcomes_total",
                "Webhook deliveries by outcome (recorded, ignored, rejected, failed)",
            ),
            &["outcome"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let signature_validation_failures = IntCounter::new(
            "signature_validation_failures_total",
            "Webhooks rejected for a missing or invalid signature",
        )?;
        let store_failures_total = IntCounter::new(
            "store_failures_total",
            "Metric store operations that failed",
        )?;
        let api_requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "Dashboard API requests by endpoint"),
            &["endpoint"],
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_outcomes_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(signature_validation_failures.clone()))?;
        registry.register(Box::new(store_failures_total.clone()))?;
        registry.register(Box::new(api_requests_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhook_requests_total,
            webhook_outcomes_total,
            webhook_duration_seconds,
            signature_validation_failures,
            store_failures_total,
            api_requests_total,
        }))
    }

    /// Record one finished webhook delivery
    pub fn record_webhook(&self, outcome: WebhookOutcome, duration: Duration) {
        self.webhook_requests_total.inc();
        self.webhook_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.webhook_duration_seconds
            .observe(duration.as_secs_f64());

        match outcome {
            WebhookOutcome::Rejected => self.signature_validation_failures.inc(),
            WebhookOutcome::Failed => self.store_failures_total.inc(),
            WebhookOutcome::Recorded | WebhookOutcome::Ignored => {}
        }
    }

    pub fn record_api_request(&self, endpoint: &str) {
        self.api_requests_total.with_label_values(&[endpoint]).inc();
    }

    pub fn record_store_failure(&self) {
        self.store_failures_total.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

/// Label values for `webhook_outcomes_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Recorded,
    Ignored,
    Rejected,
    Failed,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorded => "recorded",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
