//! Evaluation Service: scores one candidate under a per-candidate lock and
//! writes its single live result.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::EvaluationError;
use crate::evaluation::locks::CandidateLocks;
use crate::evaluation::store::{is_stale, EvaluationStore};
use crate::models::candidate::{CandidateRecord, CandidateRef, CandidateState};
use crate::records::store::RecordStore;
use crate::rubric::models::ConfigVersion;
use crate::rubric::provider::ConfigProvider;
use crate::scoring::aggregator::CandidateScorer;
use crate::scoring::models::EvaluationResult;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Whether a fresh stored evaluation may be returned instead of recomputing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    ReuseFresh,
    Recompute,
}

impl EvaluationMode {
    pub fn forced(force: bool) -> Self {
        if force {
            EvaluationMode::Recompute
        } else {
            EvaluationMode::ReuseFresh
        }
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// Scored now and written to the store.
    Computed(EvaluationResult),
    /// Served from the store; `cached` is set.
    Reused(EvaluationResult),
}

impl Outcome {
    pub fn into_result(self) -> EvaluationResult {
        match self {
            Outcome::Computed(result) | Outcome::Reused(result) => result,
        }
    }
}

/// Emitted after every write so readers can re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreChange {
    Evaluated {
        candidate_id: Uuid,
        config_version: ConfigVersion,
    },
    StateChanged {
        candidate_id: Uuid,
        state: CandidateState,
    },
    Erased {
        candidate_id: Uuid,
    },
}

/// Stored evaluation plus its staleness against the active configuration.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    #[serde(flatten)]
    pub evaluation: EvaluationResult,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_warning: Option<String>,
}

pub struct EvaluationService {
    records: Arc<dyn RecordStore>,
    evaluations: Arc<dyn EvaluationStore>,
    rubric: Arc<dyn ConfigProvider>,
    scorer: Arc<dyn CandidateScorer>,
    locks: CandidateLocks,
    changes: broadcast::Sender<StoreChange>,
}

impl EvaluationService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        evaluations: Arc<dyn EvaluationStore>,
        rubric: Arc<dyn ConfigProvider>,
        scorer: Arc<dyn CandidateScorer>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records,
            evaluations,
            rubric,
            scorer,
            locks: CandidateLocks::default(),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub fn notify(&self, change: StoreChange) {
        // no receivers is fine
        let _ = self.changes.send(change);
    }

    async fn resolve(&self, reference: &CandidateRef) -> Result<CandidateRecord, EvaluationError> {
        self.records
            .resolve(reference)
            .await?
            .ok_or_else(|| EvaluationError::NotFound(format!("candidate {reference}")))
    }

    /// Scores one candidate and replaces its stored evaluation.
    ///
    /// Closed (rejected/discarded) candidates are never rescored: their stored
    /// evaluation is returned as-is, or `Ineligible` when they have none.
    pub async fn evaluate(
        &self,
        reference: &CandidateRef,
        mode: EvaluationMode,
    ) -> Result<Outcome, EvaluationError> {
        let candidate_id = self.resolve(reference).await?.id;
        let _guard = self.locks.acquire(candidate_id).await;

        // re-read under the lock; state may have moved while waiting
        let candidate = self.resolve(&CandidateRef::Id(candidate_id)).await?;
        let active = self.rubric.get_active().await?;
        let existing = self.evaluations.get(candidate.id).await?;

        if candidate.state.is_closed() {
            debug!(candidate = %candidate.tracking_code, state = %candidate.state, "closed candidate not rescored");
            return match existing {
                Some(result) => Ok(Outcome::Reused(result.served_from_store())),
                None => Err(EvaluationError::Ineligible {
                    candidate: candidate.tracking_code,
                    state: candidate.state,
                }),
            };
        }

        if mode == EvaluationMode::ReuseFresh {
            if let Some(result) = existing.filter(|r| !is_stale(r, active.version)) {
                return Ok(Outcome::Reused(result.served_from_store()));
            }
        }

        let text = candidate
            .resume()
            .ok_or_else(|| EvaluationError::MissingInput {
                candidate: candidate.tracking_code.clone(),
            })?;

        let result = self.scorer.score(candidate.id, text, &active)?;
        self.evaluations.put(&result).await?;

        info!(
            candidate = %candidate.tracking_code,
            config_version = %active.version,
            score = result.score_promedio(),
            backend = self.scorer.backend(),
            "candidate evaluated"
        );
        self.notify(StoreChange::Evaluated {
            candidate_id: candidate.id,
            config_version: active.version,
        });

        if candidate.state.awaits_evaluation() {
            self.advance_to_evaluated(&candidate).await;
        }

        Ok(Outcome::Computed(result))
    }

    /// State edits from staff do not take the candidate lock, so the move is
    /// conditional on the candidate still awaiting evaluation. The stored
    /// result stands even if the state write fails.
    async fn advance_to_evaluated(&self, candidate: &CandidateRecord) {
        let moved = self
            .records
            .advance_candidate_state(
                candidate.id,
                &CandidateState::AWAITING_EVALUATION,
                CandidateState::Evaluated,
            )
            .await;
        match moved {
            Ok(Some(updated)) => self.notify(StoreChange::StateChanged {
                candidate_id: updated.id,
                state: updated.state,
            }),
            Ok(None) => {
                debug!(candidate = %candidate.tracking_code, "state changed during evaluation; left as is")
            }
            Err(err) => {
                warn!(candidate = %candidate.tracking_code, error = %err, "evaluation stored but state not advanced")
            }
        }
    }

    /// Stored evaluation with a staleness flag. Never recomputes.
    pub async fn evaluation(&self, reference: &CandidateRef) -> Result<EvaluationView, EvaluationError> {
        let candidate = self.resolve(reference).await?;
        let evaluation = self
            .evaluations
            .get(candidate.id)
            .await?
            .ok_or_else(|| EvaluationError::NotFound(format!("evaluation for candidate {reference}")))?;
        let active = self.rubric.get_active().await?;

        let stale = is_stale(&evaluation, active.version);
        let stale_warning = stale.then(|| {
            format!(
                "Evaluated with configuration {}; active configuration is {}. Re-evaluate to refresh.",
                evaluation.config_version, active.version
            )
        });

        Ok(EvaluationView {
            evaluation: evaluation.served_from_store(),
            stale,
            stale_warning,
        })
    }

    /// Scores raw text against the active configuration without storing anything.
    pub async fn preview(&self, text: &str) -> Result<EvaluationResult, EvaluationError> {
        let active = self.rubric.get_active().await?;
        self.scorer.score(Uuid::nil(), text, &active)
    }

    /// Removes a candidate with its comments and its evaluation.
    ///
    /// The candidate row goes first so a partial failure never leaves a live
    /// candidate without its evaluation. Postgres cascades the evaluation row.
    pub async fn erase(&self, reference: &CandidateRef) -> Result<CandidateRecord, EvaluationError> {
        let candidate = self.resolve(reference).await?;
        let _guard = self.locks.acquire(candidate.id).await;

        self.records.delete_candidate(candidate.id).await?;
        self.evaluations.delete_for(candidate.id).await?;

        info!(candidate = %candidate.tracking_code, "candidate erased");
        self.notify(StoreChange::Erased {
            candidate_id: candidate.id,
        });
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::errors::StoreError;
    use crate::evaluation::store::{HeldEvaluationStore, InMemoryEvaluationStore};
    use crate::models::candidate::NewApplication;
    use crate::models::comment::Comment;
    use crate::models::process::{ProcessRecord, ProcessState};
    use crate::records::store::InMemoryRecordStore;
    use crate::rubric::defaults;
    use crate::rubric::models::CategoryKey;
    use crate::rubric::provider::InMemoryConfigProvider;
    use crate::scoring::aggregator::KeywordScorer;

    struct Fixture {
        service: EvaluationService,
        records: Arc<InMemoryRecordStore>,
        evaluations: Arc<InMemoryEvaluationStore>,
        rubric: Arc<InMemoryConfigProvider>,
    }

    fn fixture() -> Fixture {
        let records = Arc::new(InMemoryRecordStore::new());
        let evaluations = Arc::new(InMemoryEvaluationStore::new());
        let rubric = Arc::new(InMemoryConfigProvider::new(defaults::scoring_config()));
        let service = EvaluationService::new(
            records.clone(),
            evaluations.clone(),
            rubric.clone(),
            Arc::new(KeywordScorer),
        );
        Fixture {
            service,
            records,
            evaluations,
            rubric,
        }
    }

    async fn submit(records: &InMemoryRecordStore, resume: Option<&str>) -> CandidateRecord {
        let record = NewApplication {
            full_name: "Ana Pérez".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            resume_text: resume.map(str::to_string),
            process_id: None,
        }
        .into_record();
        records.insert_candidate(record).await.unwrap()
    }

    const RESUME: &str = "Jefe de Tesorería. Flujo de caja semanal, conciliación bancaria, cierre contable en Excel.";

    #[tokio::test]
    async fn test_re_evaluation_overwrites() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);

        f.service.evaluate(&reference, EvaluationMode::Recompute).await.unwrap();
        let mut next = defaults::scoring_config();
        if let Some(ops) = next.categories.get_mut(&CategoryKey::Ops) {
            ops.keywords.push("swift".to_string());
        }
        f.rubric.set_active(next).await.unwrap();
        let second = f
            .service
            .evaluate(&reference, EvaluationMode::Recompute)
            .await
            .unwrap()
            .into_result();

        let stored = f.evaluations.get(candidate.id).await.unwrap().unwrap();
        assert_eq!(stored.config_version, ConfigVersion(2));
        assert_eq!(stored.evaluated_at, second.evaluated_at);
        assert_eq!(f.evaluations.list_for(&[candidate.id]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_evaluation_is_reused_when_allowed() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);

        let first = f
            .service
            .evaluate(&reference, EvaluationMode::ReuseFresh)
            .await
            .unwrap();
        assert!(matches!(first, Outcome::Computed(_)));

        let second = f
            .service
            .evaluate(&reference, EvaluationMode::ReuseFresh)
            .await
            .unwrap();
        match second {
            Outcome::Reused(result) => assert!(result.cached),
            other => panic!("expected reuse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_resume_is_missing_input() {
        let f = fixture();
        let candidate = submit(&f.records, None).await;
        let err = f
            .service
            .evaluate(&CandidateRef::Id(candidate.id), EvaluationMode::Recompute)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MissingInput { .. }));
        assert!(f.evaluations.get(candidate.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_candidate_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .evaluate(&CandidateRef::parse("CAND-00000000"), EvaluationMode::Recompute)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_successful_evaluation_advances_new_candidates() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let mut changes = f.service.subscribe();

        f.service
            .evaluate(&CandidateRef::Id(candidate.id), EvaluationMode::Recompute)
            .await
            .unwrap();

        let updated = f.records.candidate(candidate.id).await.unwrap().unwrap();
        assert_eq!(updated.state, CandidateState::Evaluated);
        assert!(matches!(
            changes.recv().await.unwrap(),
            StoreChange::Evaluated { .. }
        ));
    }

    #[tokio::test]
    async fn test_closed_candidates_are_not_rescored() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);

        f.records
            .set_candidate_state(candidate.id, CandidateState::Rejected)
            .await
            .unwrap();
        let err = f
            .service
            .evaluate(&reference, EvaluationMode::Recompute)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Ineligible { .. }));

        f.records
            .set_candidate_state(candidate.id, CandidateState::InReview)
            .await
            .unwrap();
        let original = f
            .service
            .evaluate(&reference, EvaluationMode::Recompute)
            .await
            .unwrap()
            .into_result();
        f.records
            .set_candidate_state(candidate.id, CandidateState::Discarded)
            .await
            .unwrap();
        let served = f
            .service
            .evaluate(&reference, EvaluationMode::Recompute)
            .await
            .unwrap();
        match served {
            Outcome::Reused(result) => assert_eq!(result.evaluated_at, original.evaluated_at),
            other => panic!("expected stored evaluation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_view_reports_staleness() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);
        f.service.evaluate(&reference, EvaluationMode::Recompute).await.unwrap();

        let view = f.service.evaluation(&reference).await.unwrap();
        assert!(!view.stale);
        assert!(view.evaluation.cached);

        f.rubric.set_active(defaults::scoring_config()).await.unwrap();
        let view = f.service.evaluation(&reference).await.unwrap();
        assert!(view.stale);
        assert!(view.stale_warning.is_some());
    }

    #[tokio::test]
    async fn test_erase_cascades_to_evaluation() {
        let f = fixture();
        let candidate = submit(&f.records, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);
        f.service.evaluate(&reference, EvaluationMode::Recompute).await.unwrap();

        f.service.erase(&reference).await.unwrap();
        assert!(f.evaluations.get(candidate.id).await.unwrap().is_none());
        assert!(f.records.candidate(candidate.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_preview_stores_nothing() {
        let f = fixture();
        let result = f.service.preview(RESUME).await.unwrap();
        assert!(result.score_promedio() > 0);
        assert!(f.evaluations.get(Uuid::nil()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejection_during_evaluation_is_kept() {
        let records = Arc::new(InMemoryRecordStore::new());
        let evaluations = Arc::new(HeldEvaluationStore::default());
        let service = Arc::new(EvaluationService::new(
            records.clone(),
            evaluations.clone(),
            Arc::new(InMemoryConfigProvider::new(defaults::scoring_config())),
            Arc::new(KeywordScorer),
        ));
        let candidate = submit(&records, Some(RESUME)).await;

        let running = {
            let service = service.clone();
            let reference = CandidateRef::Id(candidate.id);
            tokio::spawn(async move { service.evaluate(&reference, EvaluationMode::Recompute).await })
        };
        evaluations.entered.notified().await;
        records
            .set_candidate_state(candidate.id, CandidateState::Rejected)
            .await
            .unwrap();
        evaluations.release.notify_one();

        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Computed(_)));
        let stored = records.candidate(candidate.id).await.unwrap().unwrap();
        assert_eq!(stored.state, CandidateState::Rejected);
        assert!(evaluations.get(candidate.id).await.unwrap().is_some());
    }

    /// Record store whose state transitions and deletions always fail.
    struct BrokenWrites {
        inner: InMemoryRecordStore,
    }

    fn injected() -> StoreError {
        StoreError::Corrupt("injected write failure".to_string())
    }

    #[async_trait]
    impl RecordStore for BrokenWrites {
        async fn insert_candidate(&self, record: CandidateRecord) -> Result<CandidateRecord, StoreError> {
            self.inner.insert_candidate(record).await
        }
        async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError> {
            self.inner.candidate(id).await
        }
        async fn candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>, StoreError> {
            self.inner.candidate_by_code(code).await
        }
        async fn candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
            self.inner.candidates().await
        }
        async fn candidates_for_process(&self, process_id: Uuid) -> Result<Vec<CandidateRecord>, StoreError> {
            self.inner.candidates_for_process(process_id).await
        }
        async fn set_candidate_state(
            &self,
            _id: Uuid,
            _state: CandidateState,
        ) -> Result<Option<CandidateRecord>, StoreError> {
            Err(injected())
        }
        async fn advance_candidate_state(
            &self,
            _id: Uuid,
            _expected: &[CandidateState],
            _next: CandidateState,
        ) -> Result<Option<CandidateRecord>, StoreError> {
            Err(injected())
        }
        async fn delete_candidate(&self, _id: Uuid) -> Result<bool, StoreError> {
            Err(injected())
        }
        async fn append_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
            self.inner.append_comment(comment).await
        }
        async fn comments(&self, candidate_id: Uuid) -> Result<Vec<Comment>, StoreError> {
            self.inner.comments(candidate_id).await
        }
        async fn insert_process(&self, process: ProcessRecord) -> Result<ProcessRecord, StoreError> {
            self.inner.insert_process(process).await
        }
        async fn process(&self, id: Uuid) -> Result<Option<ProcessRecord>, StoreError> {
            self.inner.process(id).await
        }
        async fn processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
            self.inner.processes().await
        }
        async fn set_process_state(
            &self,
            id: Uuid,
            state: ProcessState,
        ) -> Result<Option<ProcessRecord>, StoreError> {
            self.inner.set_process_state(id, state).await
        }
    }

    #[tokio::test]
    async fn test_failed_state_write_keeps_stored_result() {
        let records = Arc::new(BrokenWrites {
            inner: InMemoryRecordStore::new(),
        });
        let evaluations = Arc::new(InMemoryEvaluationStore::new());
        let service = EvaluationService::new(
            records.clone(),
            evaluations.clone(),
            Arc::new(InMemoryConfigProvider::new(defaults::scoring_config())),
            Arc::new(KeywordScorer),
        );
        let candidate = submit(&records.inner, Some(RESUME)).await;
        let reference = CandidateRef::Id(candidate.id);

        let outcome = service
            .evaluate(&reference, EvaluationMode::Recompute)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Computed(_)));
        assert!(evaluations.get(candidate.id).await.unwrap().is_some());

        let err = service.erase(&reference).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Storage(_)));
        assert!(records.candidate(candidate.id).await.unwrap().is_some());
        assert!(evaluations.get(candidate.id).await.unwrap().is_some());
    }
}
