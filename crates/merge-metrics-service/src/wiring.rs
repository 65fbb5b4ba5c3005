//! Builds the metric deriver and its collaborators from [`ServiceConfig`].

use merge_metrics_api::ServiceConfig;
use merge_metrics_core::{
    adapters::{
        FilesystemMetricStore, GitHubClient, GitHubClientConfig, InMemoryMetricStore, JiraClient,
        JiraClientConfig,
    },
    DesignatedReviewers, MetricDeriver, MetricStore, SourceError, StoreError, TicketEnricher,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Failures while constructing service dependencies
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to open metric store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build upstream client: {0}")]
    Source(#[from] SourceError),
}

impl StartupError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Store(_) => 4,
            Self::Source(_) => 3,
        }
    }
}

/// Open the configured metric store
pub async fn build_store(config: &ServiceConfig) -> Result<Arc<dyn MetricStore>, StartupError> {
    match &config.storage.path {
        Some(path) => {
            let store = FilesystemMetricStore::open(path).await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No storage.path configured; metrics are kept in memory only");
            Ok(Arc::new(InMemoryMetricStore::new()))
        }
    }
}

/// Wire the deriver with every upstream source the configuration enables
pub async fn build_deriver(config: &ServiceConfig) -> Result<MetricDeriver, StartupError> {
    let store = build_store(config).await?;
    let mut deriver = MetricDeriver::new(store);

    match &config.github.token {
        Some(token) => {
            let mut client_config = GitHubClientConfig::new(token.clone())
                .with_api_url(config.github.api_url.clone())
                .with_timeout(Duration::from_secs(config.github.timeout_seconds));
            if let Some(user_agent) = &config.github.user_agent {
                client_config = client_config.with_user_agent(user_agent.clone());
            }

            let client = Arc::new(GitHubClient::new(client_config)?);
            let designated = DesignatedReviewers::new(&config.reviews.designated_reviewers);

            info!(
                api_url = %config.github.api_url,
                designated_reviewers = designated.len(),
                "GitHub timeline and review lookups enabled"
            );

            deriver = deriver
                .with_timeline_source(client.clone())
                .with_review_source(client, designated);
        }
        None => {
            warn!("No github.token configured; ready times fall back to opened_at and reviews stay pending");
        }
    }

    match &config.jira {
        Some(jira) => {
            let client = JiraClient::new(
                JiraClientConfig::new(jira.base_url.clone(), jira.email.clone(), jira.api_token.clone())
                    .with_timeout(Duration::from_secs(jira.timeout_seconds)),
            )?;

            info!(base_url = %jira.base_url, "Jira ticket enrichment enabled");
            deriver = deriver.with_ticket_enricher(TicketEnricher::new(Arc::new(client)));
        }
        None => {
            info!("No jira section configured; tickets are extracted without enrichment");
        }
    }

    Ok(deriver)
}

#[cfg(test)]
#[path = "wiring_tests.rs"]
mod tests;
