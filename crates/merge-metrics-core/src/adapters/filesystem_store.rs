//! # Filesystem Metric Store
//!
//! Keeps the whole metric table in a single JSON file for local development
//! and the `summary` CLI command.
//!
//! The file is loaded once on construction. Each upsert rewrites the file
//! through a temporary sibling followed by a rename, so readers never observe
//! a partially written table.

use crate::model::{MetricUpsert, PrMetric};
use crate::store::{query_order, MetricQuery, MetricStore, StoreError};
use crate::{MetricKey, RepoName};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// JSON-file backed metric store
///
/// # Examples
///
/// ```no_run
/// use merge_metrics_core::adapters::FilesystemMetricStore;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemMetricStore::open("./data/pr_metrics.json").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FilesystemMetricStore {
    path: PathBuf,
    rows: RwLock<BTreeMap<MetricKey, PrMetric>>,
}

impl FilesystemMetricStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty table.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the existing file
    /// cannot be read or parsed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::Io {
                message: format!("Failed to create store directory: {}", e),
            })?;
        }

        let rows = match fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<PrMetric> = serde_json::from_slice(&bytes)?;
                stored.into_iter().map(|row| (row.key(), row)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("Failed to read store file: {}", e),
                })
            }
        };

        info!(path = %path.display(), rows = rows.len(), "Opened filesystem metric store");

        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, rows: &BTreeMap<MetricKey, PrMetric>) -> Result<(), StoreError> {
        let table: Vec<&PrMetric> = rows.values().collect();
        let json = serde_json::to_vec_pretty(&table)?;

        // Write to temporary file first, then rename over the table
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("Failed to create temp file: {}", e),
            })?;

        file.write_all(&json).await.map_err(|e| StoreError::Io {
            message: format!("Failed to write store file: {}", e),
        })?;

        file.flush().await.map_err(|e| StoreError::Io {
            message: format!("Failed to flush store file: {}", e),
        })?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("Failed to replace store file: {}", e),
            })?;

        debug!(path = %self.path.display(), rows = table.len(), "Persisted metric table");
        Ok(())
    }
}

#[async_trait]
impl MetricStore for FilesystemMetricStore {
    async fn upsert(&self, upsert: MetricUpsert) -> Result<PrMetric, StoreError> {
        let key = upsert.key();
        let mut rows = self.rows.write().await;

        let previous = rows.get(&key).cloned();
        let row = upsert.apply(previous.clone());
        rows.insert(key.clone(), row.clone());

        if let Err(e) = self.persist(&rows).await {
            // Keep memory consistent with the file that failed to update
            match previous {
                Some(previous) => rows.insert(key, previous),
                None => rows.remove(&key),
            };
            return Err(e);
        }

        Ok(row)
    }

    async fn get(&self, repo: &RepoName, pr_number: u64) -> Result<Option<PrMetric>, StoreError> {
        let key = MetricKey::new(repo.clone(), pr_number);
        Ok(self.rows.read().await.get(&key).cloned())
    }

    async fn query(&self, query: &MetricQuery) -> Result<Vec<PrMetric>, StoreError> {
        let mut matching: Vec<PrMetric> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();

        matching.sort_by(query_order);
        Ok(matching)
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
