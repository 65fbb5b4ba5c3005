//! Tests for [`ServiceConfig`] defaults, deserialization and validation.

use super::*;

fn valid_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = SecretValue::new("s3cret");
    config
}

#[test]
fn test_defaults() {
    let config = ServiceConfig::default();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
    assert_eq!(config.webhooks.endpoint_path, "/webhook/github");
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert!(config.jira.is_none());
    assert!(config.storage.path.is_none());
    assert!(!config.logging.json_format);
}

#[test]
fn test_valid_config_passes() {
    assert!(valid_config().validate().is_ok());
}

#[test]
fn test_empty_secret_is_rejected() {
    let err = ServiceConfig::default().validate().unwrap_err();
    assert!(
        matches!(err, ConfigError::Missing { ref key } if key == "webhooks.secret"),
        "unexpected error: {:?}",
        err
    );
}

#[test]
fn test_whitespace_secret_is_rejected() {
    let mut config = valid_config();
    config.webhooks.secret = SecretValue::new("   ");
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_port_is_rejected() {
    let mut config = valid_config();
    config.server.port = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_endpoint_path_must_be_absolute() {
    let mut config = valid_config();
    config.webhooks.endpoint_path = String::new();
    assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));

    config.webhooks.endpoint_path = "webhook".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_jira_section_requires_credentials() {
    let mut config = valid_config();
    config.jira = Some(JiraConfig {
        base_url: "https://example.atlassian.net".to_string(),
        email: "bot@example.com".to_string(),
        api_token: SecretValue::new(""),
        timeout_seconds: 30,
    });

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Missing { ref key } if key == "jira.api_token"));
}

#[test]
fn test_partial_document_fills_defaults() {
    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "server": { "port": 9090 },
        "webhooks": { "secret": "abc" },
        "jira": {
            "base_url": "https://example.atlassian.net",
            "email": "bot@example.com",
            "api_token": "tok"
        },
        "reviews": { "designated_reviewers": ["alice", "bob"] }
    }))
    .unwrap();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.webhooks.endpoint_path, "/webhook/github");
    assert_eq!(config.webhooks.secret.expose_secret(), "abc");
    assert_eq!(config.jira.as_ref().unwrap().timeout_seconds, 30);
    assert_eq!(config.reviews.designated_reviewers, vec!["alice", "bob"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_debug_output_redacts_secrets() {
    let config = valid_config();
    let rendered = format!("{:?}", config);
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("REDACTED"));
}
