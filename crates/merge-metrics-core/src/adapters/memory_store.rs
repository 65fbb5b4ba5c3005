//! # In-Memory Metric Store
//!
//! Thread-safe in-memory implementation for testing, development and batch
//! runs that only render their output.

use crate::model::{MetricUpsert, PrMetric};
use crate::store::{query_order, MetricQuery, MetricStore, StoreError};
use crate::{MetricKey, RepoName};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory metric table keyed by `(repo, pr_number)`
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetricStore {
    rows: Arc<RwLock<BTreeMap<MetricKey, PrMetric>>>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with rows
    pub fn with_rows(rows: impl IntoIterator<Item = PrMetric>) -> Self {
        let map = rows.into_iter().map(|row| (row.key(), row)).collect();
        Self {
            rows: Arc::new(RwLock::new(map)),
        }
    }

    /// Every row in identity order
    pub async fn all(&self) -> Vec<PrMetric> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn upsert(&self, upsert: MetricUpsert) -> Result<PrMetric, StoreError> {
        let key = upsert.key();
        let mut rows = self.rows.write().await;

        let row = upsert.apply(rows.remove(&key));
        rows.insert(key, row.clone());

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
#[path = "memory_store_tests.rs"]
mod tests;
