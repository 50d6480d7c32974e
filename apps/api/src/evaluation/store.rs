//! Evaluation Store: at most one live `EvaluationResult` per candidate.
//!
//! `put` is an upsert keyed by candidate id. There is no history and no eviction;
//! an entry lives until `delete_for` is called by whoever erases the candidate.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::rubric::models::ConfigVersion;
use crate::scoring::models::EvaluationResult;

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<EvaluationResult>, StoreError>;

    /// Replaces any previous result for the same candidate.
    async fn put(&self, result: &EvaluationResult) -> Result<(), StoreError>;

    /// Returns whether an evaluation existed.
    async fn delete_for(&self, candidate_id: Uuid) -> Result<bool, StoreError>;

    async fn list_for(
        &self,
        candidate_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EvaluationResult>, StoreError>;
}

/// True when `result` was computed under a configuration other than the active one.
pub fn is_stale(result: &EvaluationResult, active: ConfigVersion) -> bool {
    result.config_version != active
}

#[derive(Default)]
pub struct InMemoryEvaluationStore {
    results: RwLock<HashMap<Uuid, EvaluationResult>>,
}

impl InMemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvaluationStore for InMemoryEvaluationStore {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<EvaluationResult>, StoreError> {
        Ok(self.results.read().await.get(&candidate_id).cloned())
    }

    async fn put(&self, result: &EvaluationResult) -> Result<(), StoreError> {
        let mut stored = result.clone();
        stored.cached = false;
        self.results
            .write()
            .await
            .insert(stored.candidate_id, stored);
        Ok(())
    }

    async fn delete_for(&self, candidate_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.results.write().await.remove(&candidate_id).is_some())
    }

    async fn list_for(
        &self,
        candidate_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EvaluationResult>, StoreError> {
        let results = self.results.read().await;
        Ok(candidate_ids
            .iter()
            .filter_map(|id| results.get(id).map(|r| (*id, r.clone())))
            .collect())
    }
}

/// Test store whose first `put` parks until `release` is notified, so a test
/// can act while an evaluation is in flight.
#[cfg(test)]
#[derive(Default)]
pub struct HeldEvaluationStore {
    inner: InMemoryEvaluationStore,
    held: std::sync::atomic::AtomicBool,
    pub entered: tokio::sync::Notify,
    pub release: tokio::sync::Notify,
}

#[cfg(test)]
#[async_trait]
impl EvaluationStore for HeldEvaluationStore {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<EvaluationResult>, StoreError> {
        self.inner.get(candidate_id).await
    }

    async fn put(&self, result: &EvaluationResult) -> Result<(), StoreError> {
        if !self.held.swap(true, std::sync::atomic::Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.put(result).await
    }

    async fn delete_for(&self, candidate_id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_for(candidate_id).await
    }

    async fn list_for(
        &self,
        candidate_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EvaluationResult>, StoreError> {
        self.inner.list_for(candidate_ids).await
    }
}
