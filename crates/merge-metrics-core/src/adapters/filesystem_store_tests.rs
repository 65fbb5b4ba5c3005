use super::*;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn upsert(pr_number: u64) -> MetricUpsert {
    MetricUpsert::new(
        RepoName::new("octo-org", "widgets").unwrap(),
        pr_number,
        "title",
        "alice",
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_open_missing_file_is_empty_table() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("metrics.json");

    let store = FilesystemMetricStore::open(&path).await.unwrap();
    let rows = store.query(&MetricQuery::default()).await.unwrap();

    assert!(rows.is_empty());
    assert!(path.parent().unwrap().exists());
}

#[tokio::test]
async fn test_rows_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metrics.json");

    {
        let store = FilesystemMetricStore::open(&path).await.unwrap();
        store.upsert(upsert(1)).await.unwrap();
        store.upsert(upsert(2)).await.unwrap();
        store.upsert(upsert(1)).await.unwrap();
    }

    let reopened = FilesystemMetricStore::open(&path).await.unwrap();
    let rows = reopened.query(&MetricQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 2);

    let repo = RepoName::new("octo-org", "widgets").unwrap();
    assert!(reopened.get(&repo, 2).await.unwrap().is_some());
    assert!(!path.with_extension("tmp").exists());
}

#[tokio::test]
async fn test_corrupt_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metrics.json");
    tokio::fs::write(&path, b"not json").await.unwrap();

    let result = FilesystemMetricStore::open(&path).await;
    assert!(matches!(
        result,
        Err(StoreError::SerializationFailed { .. })
    ));
}
