//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the metric store and upstream source
//! interfaces.

pub mod filesystem_store;
pub mod github_client;
pub mod jira_client;
pub mod memory_store;

pub use filesystem_store::FilesystemMetricStore;
pub use github_client::{GitHubClient, GitHubClientConfig};
pub use jira_client::{JiraClient, JiraClientConfig};
pub use memory_store::InMemoryMetricStore;
