//! Configuration types for the HTTP service.
//!
//! Every section has defaults so a partial file (or environment overrides
//! alone) yields a complete [`ServiceConfig`]. [`ServiceConfig::validate`]
//! runs once at startup.

use crate::errors::ConfigError;
use merge_metrics_core::SecretValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook ingestion settings
    pub webhooks: WebhookConfig,

    /// GitHub API access
    pub github: GitHubConfig,

    /// Jira access; ticket enrichment is disabled when absent
    pub jira: Option<JiraConfig>,

    /// Review classification settings
    pub reviews: ReviewsConfig,

    /// Metric store location
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check settings that would otherwise fail at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if self.webhooks.endpoint_path.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.endpoint_path".to_string(),
            });
        }

        if !self.webhooks.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhooks.endpoint_path must start with '/': {}",
                    self.webhooks.endpoint_path
                ),
            });
        }

        if self.webhooks.secret.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhooks.secret".to_string(),
            });
        }

        if let Some(jira) = &self.jira {
            jira.validate()?;
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Webhook ingestion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Shared HMAC secret configured on the GitHub webhook
    pub secret: SecretValue,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook/github".to_string(),
            secret: SecretValue::new(""),
        }
    }
}

/// GitHub API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API base URL
    pub api_url: String,

    /// Token for timeline and review lookups; lookups are skipped when absent
    pub token: Option<SecretValue>,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// User-Agent override
    pub user_agent: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            timeout_seconds: 30,
            user_agent: None,
        }
    }
}

/// Jira API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://example.atlassian.net`
    pub base_url: String,

    /// Account email used for basic auth
    pub email: String,

    /// API token paired with `email`
    pub api_token: SecretValue,

    /// Per-request timeout in seconds
    #[serde(default = "default_jira_timeout")]
    pub timeout_seconds: u64,
}

fn default_jira_timeout() -> u64 {
    30
}

impl JiraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "jira.base_url".to_string(),
            });
        }
        if self.email.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "jira.email".to_string(),
            });
        }
        if self.api_token.is_empty() {
            return Err(ConfigError::Missing {
                key: "jira.api_token".to_string(),
            });
        }
        Ok(())
    }
}

/// Review classification configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReviewsConfig {
    /// Logins whose reviews count towards the QA track
    pub designated_reviewers: Vec<String>,
}

/// Metric store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the store; in-memory when absent
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
