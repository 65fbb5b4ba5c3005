use super::*;
use merge_metrics_api::JiraConfig;
use chrono::{TimeZone, Utc};
use merge_metrics_core::{MetricUpsert, RepoName, SecretValue};

fn upsert() -> MetricUpsert {
    MetricUpsert::new(
        RepoName::new("octo-org", "widgets").unwrap(),
        1,
        "t",
        "alice",
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_default_config_uses_memory_store() {
    let deriver = build_deriver(&ServiceConfig::default()).await.unwrap();

    deriver.store().upsert(upsert()).await.unwrap();
    let repo = RepoName::new("octo-org", "widgets").unwrap();
    assert!(deriver.store().get(&repo, 1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_storage_path_opens_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("metrics.json");

    let mut config = ServiceConfig::default();
    config.storage.path = Some(path.clone());

    let deriver = build_deriver(&config).await.unwrap();
    deriver.store().upsert(upsert()).await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_corrupt_store_file_is_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    std::fs::write(&path, b"not json").unwrap();

    let mut config = ServiceConfig::default();
    config.storage.path = Some(path);

    let err = build_deriver(&config).await.err().unwrap();
    assert!(matches!(err, StartupError::Store(_)));
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_github_and_jira_sections_build_clients() {
    let mut config = ServiceConfig::default();
    config.github.token = Some(SecretValue::new("ghp_token"));
    config.github.user_agent = Some("merge-metrics-tests".to_string());
    config.reviews.designated_reviewers = vec!["qa-lead".to_string()];
    config.jira = Some(JiraConfig {
        base_url: "https://example.atlassian.net".to_string(),
        email: "bot@example.com".to_string(),
        api_token: SecretValue::new("tok"),
        timeout_seconds: 5,
    });

    assert!(build_deriver(&config).await.is_ok());
}
