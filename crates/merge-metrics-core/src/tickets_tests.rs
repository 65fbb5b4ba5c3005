use super::*;
use chrono::TimeZone;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_extract_ticket_with_prefix() {
    let body = "Fixes the widget.\n\nRelated Jira issue: KP-13760\nAlso see KP-1";
    assert_eq!(extract_ticket_ref(Some(body)).as_deref(), Some("KP-13760"));
}

#[test]
fn test_extract_first_bare_ticket() {
    assert_eq!(
        extract_ticket_ref(Some("touches AB2-9 and CD-10")).as_deref(),
        Some("AB2-9")
    );
}

#[test]
fn test_extract_ignores_non_matching_text() {
    assert_eq!(extract_ticket_ref(None), None);
    assert_eq!(extract_ticket_ref(Some("lowercase kp-12 only")), None);
    assert_eq!(extract_ticket_ref(Some("K-12 single letter key")), None);
}

#[test]
fn test_priority_mapping_table() {
    assert_eq!(map_priority(Some("Lowest")), Priority::Lowest);
    assert_eq!(map_priority(Some("LOW")), Priority::Low);
    assert_eq!(map_priority(Some("Medium")), Priority::Medium);
    assert_eq!(map_priority(Some("High")), Priority::High);
    assert_eq!(map_priority(Some("Highest")), Priority::Highest);
    assert_eq!(map_priority(Some("Critical")), Priority::Highest);
    assert_eq!(map_priority(Some("Blocker")), Priority::Highest);
    assert_eq!(map_priority(Some("Trivial")), Priority::Medium);
    assert_eq!(map_priority(None), Priority::Medium);
}

#[test]
fn test_due_date_is_end_of_business_day_utc() {
    assert_eq!(
        normalize_due_date("2024-01-09"),
        Some(Utc.with_ymd_and_hms(2024, 1, 9, 17, 0, 0).unwrap())
    );
    assert_eq!(normalize_due_date("09/01/2024"), None);
    assert_eq!(normalize_due_date("2024-02-30"), None);
}

struct CountingSource {
    calls: AtomicUsize,
    response: Result<Option<TicketFields>, ()>,
}

impl CountingSource {
    fn new(response: Result<Option<TicketFields>, ()>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response,
        }
    }
}

#[async_trait]
impl TicketSource for CountingSource {
    async fn fetch_ticket(&self, _key: &str) -> Result<Option<TicketFields>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(|_| SourceError::HttpStatus {
            service: "jira",
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_enrich_maps_fields_and_memoizes() {
    let source = Arc::new(CountingSource::new(Ok(Some(TicketFields {
        priority_name: Some("Blocker".to_string()),
        due_date: Some("2024-01-09".to_string()),
    }))));
    let enricher = TicketEnricher::new(source.clone());
    let cache = TicketCache::new();

    let first = enricher.enrich("KP-1", &cache).await;
    let second = enricher.enrich("KP-1", &cache).await;

    assert_eq!(first.priority, Priority::Highest);
    assert_eq!(
        first.due_date,
        Some(Utc.with_ymd_and_hms(2024, 1, 9, 17, 0, 0).unwrap())
    );
    assert_eq!(first, second);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_failed_lookup_is_cached_as_no_data() {
    let source = Arc::new(CountingSource::new(Err(())));
    let enricher = TicketEnricher::new(source.clone());
    let cache = TicketCache::new();

    let first = enricher.enrich("KP-2", &cache).await;
    let second = enricher.enrich("KP-2", &cache).await;

    assert_eq!(first, TicketDetails::default());
    assert_eq!(second, TicketDetails::default());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get("KP-2").await, Some(None));
}

#[tokio::test]
async fn test_missing_ticket_uses_defaults() {
    let source = Arc::new(CountingSource::new(Ok(None)));
    let enricher = TicketEnricher::new(source);
    let cache = TicketCache::new();

    let details = enricher.enrich("KP-3", &cache).await;
    assert_eq!(details.priority, Priority::Medium);
    assert_eq!(details.due_date, None);
}

#[tokio::test]
async fn test_separate_caches_do_not_share_entries() {
    let source = Arc::new(CountingSource::new(Ok(None)));
    let enricher = TicketEnricher::new(source.clone());

    enricher.enrich("KP-4", &TicketCache::new()).await;
    enricher.enrich("KP-4", &TicketCache::new()).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_enrich_text_without_ticket_skips_lookup() {
    let source = Arc::new(CountingSource::new(Ok(None)));
    let enricher = TicketEnricher::new(source.clone());
    let cache = TicketCache::new();

    let (ticket, details) = enricher.enrich_text(Some("no reference"), &cache).await;

    assert_eq!(ticket, None);
    assert_eq!(details, TicketDetails::default());
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert!(cache.is_empty().await);
}
