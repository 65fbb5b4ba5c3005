//! # Jira REST Client
//!
//! [`TicketSource`] backed by `GET /rest/api/3/issue/{key}` with HTTP basic
//! authentication (`email:api_token`).

use crate::signature::SecretValue;
use crate::tickets::{TicketFields, TicketSource};
use crate::SourceError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

const SERVICE: &str = "jira";

/// Connection settings for [`JiraClient`]
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    /// Site base URL, e.g. `https://example.atlassian.net`
    pub base_url: String,
    pub email: String,
    pub api_token: SecretValue,
    pub timeout: Duration,
}

impl JiraClientConfig {
    pub fn new(base_url: impl Into<String>, email: impl Into<String>, api_token: SecretValue) -> Self {
        Self {
            base_url: base_url.into(),
            email: email.into(),
            api_token,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    #[serde(default)]
    priority: Option<NamedField>,
    #[serde(default)]
    duedate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedField {
    name: Option<String>,
}

impl From<IssueResponse> for TicketFields {
    fn from(issue: IssueResponse) -> Self {
        Self {
            priority_name: issue.fields.priority.and_then(|p| p.name),
            due_date: issue.fields.duedate,
        }
    }
}

/// Jira Cloud REST API client
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    config: JiraClientConfig,
}

impl JiraClient {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: JiraClientConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl TicketSource for JiraClient {
    #[instrument(skip(self))]
    async fn fetch_ticket(&self, key: &str) -> Result<Option<TicketFields>, SourceError> {
        let url = format!(
            "{}/rest/api/3/issue/{}",
            self.config.base_url.trim_end_matches('/'),
            key
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.email, Some(self.config.api_token.expose_secret()))
            .header("Accept", "application/json")
            .query(&[("fields", "priority,duedate")])
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        let issue: IssueResponse = response.json().await.map_err(|e| SourceError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        Ok(Some(issue.into()))
    }
}

#[cfg(test)]
#[path = "jira_client_tests.rs"]
mod tests;
