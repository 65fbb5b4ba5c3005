//! Ticket reference extraction and ticket-system enrichment.
//!
//! A pull request body may reference a Jira issue (`KP-13760`, optionally
//! prefixed by `Related Jira issue:`). The referenced ticket supplies the
//! priority and due date of the metric row.

use crate::model::Priority;
use crate::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const TICKET_PATTERN: &str = r"(?:Related Jira issue:\s*)?([A-Z][A-Z0-9]+-\d+)";

static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TICKET_PATTERN).expect("valid regex"));

/// Hour of day (UTC) a bare due date resolves to
const DUE_DATE_END_OF_DAY_HOUR: u32 = 17;

// ============================================================================
// Pure helpers
// ============================================================================

/// First ticket key found in `text`, if any.
pub fn extract_ticket_ref(text: Option<&str>) -> Option<String> {
    TICKET_RE
        .captures(text?)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Map an external priority name onto the five-level scale.
///
/// Unknown or absent names map to [`Priority::Medium`].
pub fn map_priority(name: Option<&str>) -> Priority {
    let Some(name) = name else {
        return Priority::Medium;
    };

    match name.trim().to_ascii_lowercase().as_str() {
        "lowest" => Priority::Lowest,
        "low" => Priority::Low,
        "medium" => Priority::Medium,
        "high" => Priority::High,
        "highest" | "critical" | "blocker" => Priority::Highest,
        _ => Priority::Medium,
    }
}

/// Normalize a `YYYY-MM-DD` due date to 17:00 UTC on that day.
pub fn normalize_due_date(date: &str) -> Option<DateTime<Utc>> {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(day) => day
            .and_hms_opt(DUE_DATE_END_OF_DAY_HOUR, 0, 0)
            .map(|dt| dt.and_utc()),
        Err(e) => {
            warn!(due_date = date, error = %e, "Unparseable ticket due date ignored");
            None
        }
    }
}

// ============================================================================
// Ticket source and cache
// ============================================================================

/// Raw ticket fields as reported by the ticket system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFields {
    pub priority_name: Option<String>,
    pub due_date: Option<String>,
}

/// Enrichment values derived from a ticket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl TicketDetails {
    pub fn from_fields(fields: &TicketFields) -> Self {
        Self {
            priority: map_priority(fields.priority_name.as_deref()),
            due_date: fields.due_date.as_deref().and_then(normalize_due_date),
        }
    }
}

/// Lookup interface for the external ticket system
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Fetch ticket fields; `Ok(None)` when the ticket does not exist
    async fn fetch_ticket(&self, key: &str) -> Result<Option<TicketFields>, SourceError>;
}

/// Per-run memo of ticket lookups.
///
/// Owned by one batch run or one webhook delivery. Failed and missing
/// lookups are cached as "no data" so each key is requested at most once.
#[derive(Debug, Default)]
pub struct TicketCache {
    entries: RwLock<HashMap<String, Option<TicketDetails>>>,
    stats: RwLock<TicketCacheStats>,
}

/// Hit/miss counters for a [`TicketCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketCacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl TicketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for `key`: `None` if never looked up
    pub async fn get(&self, key: &str) -> Option<Option<TicketDetails>> {
        let cached = self.entries.read().await.get(key).copied();

        let mut stats = self.stats.write().await;
        if cached.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        cached
    }

    pub async fn insert(&self, key: &str, details: Option<TicketDetails>) {
        self.entries.write().await.insert(key.to_string(), details);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> TicketCacheStats {
        *self.stats.read().await
    }
}

// ============================================================================
// Enricher
// ============================================================================

/// Resolves ticket keys to [`TicketDetails`] through a [`TicketSource`].
#[derive(Clone)]
pub struct TicketEnricher {
    source: Arc<dyn TicketSource>,
}

impl TicketEnricher {
    pub fn new(source: Arc<dyn TicketSource>) -> Self {
        Self { source }
    }

    /// Details for `ticket`; failures and missing tickets yield defaults.
    pub async fn enrich(&self, ticket: &str, cache: &TicketCache) -> TicketDetails {
        if let Some(cached) = cache.get(ticket).await {
            return cached.unwrap_or_default();
        }

        let details = match self.source.fetch_ticket(ticket).await {
            Ok(Some(fields)) => Some(TicketDetails::from_fields(&fields)),
            Ok(None) => {
                debug!(ticket = ticket, "Ticket not found");
                None
            }
            Err(e) => {
                warn!(ticket = ticket, error = %e, "Ticket lookup failed, using defaults");
                None
            }
        };

        cache.insert(ticket, details).await;
        details.unwrap_or_default()
    }

    /// Extract a ticket key from free text and enrich it.
    ///
    /// Returns the key (if any) together with its details.
    pub async fn enrich_text(
        &self,
        text: Option<&str>,
        cache: &TicketCache,
    ) -> (Option<String>, TicketDetails) {
        match extract_ticket_ref(text) {
            Some(ticket) => {
                let details = self.enrich(&ticket, cache).await;
                (Some(ticket), details)
            }
            None => (None, TicketDetails::default()),
        }
    }
}

#[cfg(test)]
#[path = "tickets_tests.rs"]
mod tests;
