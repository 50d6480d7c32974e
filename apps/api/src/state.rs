use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::evaluation::batch::BatchOrchestrator;
use crate::evaluation::service::EvaluationService;
use crate::evaluation::store::{EvaluationStore, InMemoryEvaluationStore};
use crate::records::store::{InMemoryRecordStore, RecordStore};
use crate::rubric::models::ScoringConfig;
use crate::rubric::provider::{ConfigProvider, InMemoryConfigProvider};
use crate::scoring::aggregator::KeywordScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub records: Arc<dyn RecordStore>,
    pub evaluation_store: Arc<dyn EvaluationStore>,
    pub rubric: Arc<dyn ConfigProvider>,
    pub evaluations: Arc<EvaluationService>,
    pub batch: Arc<BatchOrchestrator>,
    /// Root token; batch runs take child tokens so shutdown stops them between candidates.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires the evaluation service and batch orchestrator over the given stores.
    pub fn assemble(
        config: Config,
        records: Arc<dyn RecordStore>,
        evaluation_store: Arc<dyn EvaluationStore>,
        rubric: Arc<dyn ConfigProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        let evaluations = Arc::new(EvaluationService::new(
            records.clone(),
            evaluation_store.clone(),
            rubric.clone(),
            Arc::new(KeywordScorer),
        ));
        let batch = Arc::new(BatchOrchestrator::new(evaluations.clone(), records.clone()));

        AppState {
            config,
            records,
            evaluation_store,
            rubric,
            evaluations,
            batch,
            shutdown,
        }
    }

    /// Everything in memory; used when no database is configured.
    pub fn in_memory(config: Config, seed: ScoringConfig, shutdown: CancellationToken) -> Self {
        Self::assemble(
            config,
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryEvaluationStore::new()),
            Arc::new(InMemoryConfigProvider::new(seed)),
            shutdown,
        )
    }
}
