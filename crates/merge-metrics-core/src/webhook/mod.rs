//! # Webhook Event Model
//!
//! Typed view of the GitHub `pull_request` webhook payload and the mapping
//! from a delivery onto a lifecycle [`Transition`].
//!
//! Only two transitions produce writes:
//! - **Opened**: `action == "opened"` with a `pull_request`
//! - **Merged**: `action == "closed"` with `pull_request.merged == true`
//!
//! Every other delivery is acknowledged and ignored.

use crate::{RepoName, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Payload types
// ============================================================================

/// The subset of a `pull_request` webhook delivery that drives derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub pull_request: Option<PullRequestPayload>,
    #[serde(default)]
    pub repository: Option<RepositoryPayload>,
}

/// Pull request object as sent in webhooks and returned by the pulls API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: Option<UserPayload>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub body: Option<String>,
}

impl PullRequestPayload {
    /// Author login, empty when GitHub reports no user (deleted account)
    pub fn author(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("")
    }

    /// Merged flag, falling back to `merged_at` when the flag is absent.
    ///
    /// The pulls list API omits `merged`; webhooks always include it.
    pub fn is_merged(&self) -> bool {
        self.merged.unwrap_or(self.merged_at.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPayload {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<UserPayload>,
}

impl RepositoryPayload {
    /// Repository identity, preferring `full_name`
    pub fn repo_name(&self) -> Result<RepoName, ValidationError> {
        if let Some(full_name) = &self.full_name {
            return full_name.parse();
        }

        match (&self.owner, &self.name) {
            (Some(owner), Some(name)) => RepoName::new(owner.login.clone(), name.clone()),
            _ => Err(ValidationError::Required {
                field: "repository.full_name".to_string(),
            }),
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Lifecycle transition a delivery represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Opened,
    Merged { merged_at: DateTime<Utc> },
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => f.write_str("opened"),
            Self::Merged { .. } => f.write_str("merged"),
        }
    }
}

/// A delivery that maps onto a transition, with its resolved identity
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent<'a> {
    pub repo: RepoName,
    pub pull_request: &'a PullRequestPayload,
    pub transition: Transition,
}

impl PullRequestEvent {
    /// Parse a raw delivery body
    pub fn from_slice(raw_body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw_body)
    }

    /// Map the delivery onto a transition, or explain why it is ignored.
    pub fn classify(&self) -> Result<ClassifiedEvent<'_>, String> {
        let Some(pull_request) = &self.pull_request else {
            return Err("not a pull request event".to_string());
        };

        let transition = match self.action.as_str() {
            "opened" => Transition::Opened,
            "closed" if pull_request.is_merged() => match pull_request.merged_at {
                Some(merged_at) => Transition::Merged { merged_at },
                None => return Err("merged pull request without merged_at".to_string()),
            },
            "closed" => return Err("closed without merge".to_string()),
            other => return Err(format!("action '{}' is not tracked", other)),
        };

        let repo = self
            .repository
            .as_ref()
            .ok_or_else(|| "missing repository".to_string())?
            .repo_name()
            .map_err(|e| format!("invalid repository: {}", e))?;

        Ok(ClassifiedEvent {
            repo,
            pull_request,
            transition,
        })
    }
}

mod deriver;
pub use deriver::{DeriveError, DeriveOutcome, MetricDeriver, RecordedMetric};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
