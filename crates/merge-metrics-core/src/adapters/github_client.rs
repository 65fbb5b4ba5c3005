//! # GitHub REST Client
//!
//! Read-only client for the three GitHub endpoints the metrics pipeline uses:
//! issue timelines, pull request reviews and the pull request listing.
//!
//! All list endpoints are paged with `per_page=100`; paging stops at the
//! first short page.

use crate::reviews::{Review, ReviewSource, ReviewState};
use crate::signature::SecretValue;
use crate::timeline::{TimelineEvent, TimelineSource};
use crate::webhook::{PullRequestPayload, UserPayload};
use crate::{RepoName, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "github";
const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";

/// Connection settings for [`GitHubClient`]
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// GitHub API base URL
    pub api_url: String,
    /// Token sent as `Authorization: Bearer`
    pub token: SecretValue,
    /// Request timeout duration
    pub timeout: Duration,
    /// User agent string (required by GitHub)
    pub user_agent: String,
}

impl GitHubClientConfig {
    pub fn new(token: SecretValue) -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token,
            timeout: Duration::from_secs(30),
            user_agent: format!("merge-metrics/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Review as returned by `GET /repos/{o}/{r}/pulls/{n}/reviews`
#[derive(Debug, Deserialize)]
struct ReviewResponse {
    user: Option<UserPayload>,
    state: ReviewState,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

impl From<ReviewResponse> for Review {
    fn from(r: ReviewResponse) -> Self {
        Self {
            reviewer: r.user.map(|u| u.login).unwrap_or_default(),
            state: r.state,
            submitted_at: r.submitted_at,
        }
    }
}

/// GitHub REST API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    config: GitHubClientConfig,
}

impl GitHubClient {
    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: GitHubClientConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SourceError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubClientConfig {
        &self.config
    }

    /// Pull requests of `repo` created at or after `since`, newest first.
    ///
    /// Listing is ordered by creation time descending, so paging stops as
    /// soon as a page reaches back past `since`.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn list_pull_requests(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequestPayload>, SourceError> {
        let path = format!("/repos/{}/{}/pulls", repo.owner(), repo.name());
        let mut results = Vec::new();
        let mut page = 1u32;

        loop {
            let batch: Vec<PullRequestPayload> = self
                .get_page(
                    &path,
                    &[("state", "all"), ("sort", "created"), ("direction", "desc")],
                    page,
                )
                .await?;

            let batch_len = batch.len();
            let reached_window_start = batch.iter().any(|pr| pr.created_at < since);
            results.extend(batch.into_iter().filter(|pr| pr.created_at >= since));

            if batch_len < PAGE_SIZE || reached_window_start {
                break;
            }
            page += 1;
        }

        debug!(count = results.len(), pages = page, "Listed pull requests");
        Ok(results)
    }

    /// Fetch every page of a list endpoint
    async fn get_all_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, SourceError> {
        let mut results = Vec::new();
        let mut page = 1u32;

        loop {
            let batch: Vec<T> = self.get_page(path, &[], page).await?;
            let batch_len = batch.len();
            results.extend(batch);

            if batch_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(results)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<Vec<T>, SourceError> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        let page = page.to_string();
        let per_page = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(query)
            .query(&[("per_page", per_page.as_str()), ("page", page.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| SourceError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl TimelineSource for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn fetch_timeline(
        &self,
        repo: &RepoName,
        pr_number: u64,
    ) -> Result<Vec<TimelineEvent>, SourceError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/timeline",
            repo.owner(),
            repo.name(),
            pr_number
        );
        self.get_all_pages(&path).await
    }
}

#[async_trait]
impl ReviewSource for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn fetch_reviews(
        &self,
        repo: &RepoName,
        pr_number: u64,
    ) -> Result<Vec<Review>, SourceError> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/reviews",
            repo.owner(),
            repo.name(),
            pr_number
        );
        let reviews: Vec<ReviewResponse> = self.get_all_pages(&path).await?;
        Ok(reviews.into_iter().map(Review::from).collect())
    }
}

#[cfg(test)]
#[path = "github_client_tests.rs"]
mod tests;
