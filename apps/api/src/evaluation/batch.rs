//! Batch Evaluation Orchestrator.
//!
//! Each candidate is an independent attempt: a failure is recorded in the report
//! and the run moves on. Only an empty candidate set refuses to start.
//! The cancellation token is checked before each attempt starts; an attempt that
//! has started always finishes so no half-written evaluation is left behind.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{ErrorKind, EvaluationError};
use crate::evaluation::service::{EvaluationMode, EvaluationService, Outcome};
use crate::models::candidate::CandidateRef;
use crate::records::store::RecordStore;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Re-score candidates whose stored evaluation is still fresh.
    pub force: bool,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    /// Keyed by candidate id; by the reference as submitted when it did not
    /// resolve to a candidate.
    pub errors: BTreeMap<String, ErrorKind>,
    pub messages: BTreeMap<String, String>,
}

enum Attempt {
    Finished(Result<Outcome, EvaluationError>),
    Cancelled,
}

impl BatchReport {
    fn record(&mut self, key: String, attempt: Attempt) {
        match attempt {
            Attempt::Finished(Ok(Outcome::Computed(_))) => self.succeeded += 1,
            Attempt::Finished(Ok(Outcome::Reused(_))) => self.skipped += 1,
            Attempt::Finished(Err(err)) => {
                warn!(candidate = %key, error = %err, "candidate evaluation failed");
                self.failed += 1;
                self.errors.insert(key.clone(), err.kind());
                self.messages.insert(key, err.to_string());
            }
            Attempt::Cancelled => self.cancelled += 1,
        }
    }
}

pub struct BatchOrchestrator {
    service: Arc<EvaluationService>,
    records: Arc<dyn RecordStore>,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<EvaluationService>, records: Arc<dyn RecordStore>) -> Self {
        Self { service, records }
    }

    /// Evaluates every referenced candidate once, in input order.
    pub async fn evaluate_all(
        &self,
        references: &[CandidateRef],
        options: BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, EvaluationError> {
        let mut seen = HashSet::new();
        let unique: Vec<CandidateRef> = references
            .iter()
            .filter(|r| seen.insert((*r).clone()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Err(EvaluationError::EmptyBatch);
        }

        let mode = EvaluationMode::forced(options.force);
        let concurrency = options.concurrency.max(1);
        info!(total = unique.len(), concurrency, force = options.force, "batch evaluation started");

        let attempts: Vec<(String, Attempt)> = stream::iter(unique)
            .map(|reference| {
                let service = self.service.clone();
                let records = self.records.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (reference.to_string(), Attempt::Cancelled);
                    }
                    let candidate_id = match records.resolve(&reference).await {
                        Ok(Some(candidate)) => candidate.id,
                        Ok(None) => {
                            let missing = EvaluationError::NotFound(format!("candidate {reference}"));
                            return (reference.to_string(), Attempt::Finished(Err(missing)));
                        }
                        Err(err) => return (reference.to_string(), Attempt::Finished(Err(err.into()))),
                    };
                    let result = service.evaluate(&CandidateRef::Id(candidate_id), mode).await;
                    (candidate_id.to_string(), Attempt::Finished(result))
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut report = BatchReport {
            total: attempts.len(),
            ..BatchReport::default()
        };
        for (key, attempt) in attempts {
            report.record(key, attempt);
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "batch evaluation finished"
        );
        Ok(report)
    }

    /// Evaluates all candidates of a process in submission order.
    pub async fn evaluate_process(
        &self,
        process_id: Uuid,
        options: BatchOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, EvaluationError> {
        if self.records.process(process_id).await?.is_none() {
            return Err(EvaluationError::NotFound(format!("process {process_id}")));
        }
        let references: Vec<CandidateRef> = self
            .records
            .candidates_for_process(process_id)
            .await?
            .into_iter()
            .map(|c| CandidateRef::Id(c.id))
            .collect();
        self.evaluate_all(&references, options, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::store::{EvaluationStore, HeldEvaluationStore, InMemoryEvaluationStore};
    use crate::models::candidate::CandidateRecord;
    use crate::models::candidate::{CandidateState, NewApplication};
    use crate::models::process::NewProcess;
    use crate::records::store::InMemoryRecordStore;
    use crate::rubric::defaults;
    use crate::rubric::models::CategoryKey;
    use crate::rubric::provider::{ConfigProvider, InMemoryConfigProvider};
    use crate::scoring::aggregator::{evaluate_text, KeywordScorer};

    const RESUMES: [&str; 4] = [
        "Analista senior. Cierre contable mensual, auditoría y estados financieros en Excel.",
        "Tesorería: flujo de caja semanal, liquidez, conciliación bancaria y pagos.",
        "Liderazgo de equipo, mejora continua, KPI y automatización de procesos.",
        "Gerente de finanzas en fintech. Contabilidad, banco, estrategia y growth.",
    ];

    struct Fixture {
        orchestrator: BatchOrchestrator,
        records: Arc<InMemoryRecordStore>,
        evaluations: Arc<InMemoryEvaluationStore>,
        rubric: Arc<InMemoryConfigProvider>,
    }

    fn fixture() -> Fixture {
        let records = Arc::new(InMemoryRecordStore::new());
        let evaluations = Arc::new(InMemoryEvaluationStore::new());
        let rubric = Arc::new(InMemoryConfigProvider::new(defaults::scoring_config()));
        let service = Arc::new(EvaluationService::new(
            records.clone(),
            evaluations.clone(),
            rubric.clone(),
            Arc::new(KeywordScorer),
        ));
        Fixture {
            orchestrator: BatchOrchestrator::new(service, records.clone()),
            records,
            evaluations,
            rubric,
        }
    }

    fn options(force: bool) -> BatchOptions {
        BatchOptions {
            force,
            concurrency: 3,
        }
    }

    async fn submit(f: &Fixture, resume: Option<&str>, process_id: Option<Uuid>) -> Uuid {
        let record = NewApplication {
            full_name: "Postulante".to_string(),
            email: "p@example.com".to_string(),
            phone: None,
            resume_text: resume.map(str::to_string),
            process_id,
        }
        .into_record();
        f.records.insert_candidate(record).await.unwrap().id
    }

    #[tokio::test]
    async fn test_one_bad_candidate_does_not_abort_the_batch() {
        let f = fixture();
        let mut ids = Vec::new();
        for resume in RESUMES {
            ids.push(submit(&f, Some(resume), None).await);
        }
        let broken = submit(&f, None, None).await;
        ids.insert(2, broken);

        let references: Vec<CandidateRef> = ids.iter().map(|id| CandidateRef::Id(*id)).collect();
        let report = f
            .orchestrator
            .evaluate_all(&references, options(false), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.get(&broken.to_string()), Some(&ErrorKind::MissingInput));
        assert!(report.messages.contains_key(&broken.to_string()));

        let active = f.rubric.get_active().await.unwrap();
        for (id, resume) in ids.iter().filter(|id| **id != broken).zip(RESUMES) {
            let stored = f.evaluations.get(*id).await.unwrap().unwrap();
            let expected = evaluate_text(*id, resume, &active).unwrap();
            assert_eq!(stored.fits, expected.fits);
            assert_eq!(stored.score_promedio(), expected.score_promedio());
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_hard_error() {
        let f = fixture();
        let err = f
            .orchestrator
            .evaluate_all(&[], options(false), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_fresh_evaluations_are_skipped_unless_forced() {
        let f = fixture();
        let id = submit(&f, Some(RESUMES[1]), None).await;
        let references = [CandidateRef::Id(id)];
        let token = CancellationToken::new();

        let first = f.orchestrator.evaluate_all(&references, options(false), &token).await.unwrap();
        assert_eq!(first.succeeded, 1);

        let second = f.orchestrator.evaluate_all(&references, options(false), &token).await.unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.succeeded, 0);

        let forced = f.orchestrator.evaluate_all(&references, options(true), &token).await.unwrap();
        assert_eq!(forced.succeeded, 1);
    }

    #[tokio::test]
    async fn test_stale_evaluations_are_recomputed() {
        let f = fixture();
        let id = submit(&f, Some(RESUMES[0]), None).await;
        let references = [CandidateRef::Id(id)];
        let token = CancellationToken::new();
        f.orchestrator.evaluate_all(&references, options(false), &token).await.unwrap();

        let mut next = defaults::scoring_config();
        if let Some(admin) = next.categories.get_mut(&CategoryKey::Admin) {
            admin.keywords.push("ifrs".to_string());
        }
        f.rubric.set_active(next).await.unwrap();

        let report = f.orchestrator.evaluate_all(&references, options(false), &token).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_starts_nothing() {
        let f = fixture();
        let a = submit(&f, Some(RESUMES[0]), None).await;
        let b = submit(&f, Some(RESUMES[1]), None).await;
        let token = CancellationToken::new();
        token.cancel();

        let report = f
            .orchestrator
            .evaluate_all(&[CandidateRef::Id(a), CandidateRef::Id(b)], options(false), &token)
            .await
            .unwrap();
        assert_eq!(report.cancelled, 2);
        assert_eq!(report.succeeded, 0);
        assert!(f.evaluations.get(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_references_are_attempted_once() {
        let f = fixture();
        let id = submit(&f, Some(RESUMES[2]), None).await;
        let reference = CandidateRef::Id(id);
        let report = f
            .orchestrator
            .evaluate_all(
                &[reference.clone(), reference.clone(), reference],
                options(true),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_process_batch_counts_closed_candidates() {
        let f = fixture();
        let process = f
            .records
            .insert_process(
                NewProcess {
                    code: "FIN-07".to_string(),
                    role_title: "Jefe de Finanzas".to_string(),
                    vacancies: 1,
                }
                .into_record(),
            )
            .await
            .unwrap();
        let open = submit(&f, Some(RESUMES[0]), Some(process.id)).await;
        let rejected = submit(&f, Some(RESUMES[1]), Some(process.id)).await;
        f.records
            .set_candidate_state(rejected, CandidateState::Rejected)
            .await
            .unwrap();

        let report = f
            .orchestrator
            .evaluate_process(process.id, options(false), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.get(&rejected.to_string()), Some(&ErrorKind::Ineligible));
        assert!(f.evaluations.get(open).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unknown_process_is_not_found() {
        let f = fixture();
        let err = f
            .orchestrator
            .evaluate_process(Uuid::new_v4(), options(false), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_errors_are_keyed_by_candidate_id() {
        let f = fixture();
        let id = submit(&f, None, None).await;
        let code = f.records.candidate(id).await.unwrap().unwrap().tracking_code;

        let report = f
            .orchestrator
            .evaluate_all(
                &[CandidateRef::parse(&code), CandidateRef::parse("CAND-FFFFFFFF")],
                options(false),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.errors.get(&id.to_string()), Some(&ErrorKind::MissingInput));
        assert_eq!(report.errors.get("CAND-FFFFFFFF"), Some(&ErrorKind::NotFound));
        assert!(!report.errors.contains_key(&code));
    }

    #[tokio::test]
    async fn test_cancel_mid_run_lets_in_flight_attempt_finish() {
        let records = Arc::new(InMemoryRecordStore::new());
        let evaluations = Arc::new(HeldEvaluationStore::default());
        let service = Arc::new(EvaluationService::new(
            records.clone(),
            evaluations.clone(),
            Arc::new(InMemoryConfigProvider::new(defaults::scoring_config())),
            Arc::new(KeywordScorer),
        ));
        let orchestrator = Arc::new(BatchOrchestrator::new(service, records.clone()));

        let mut ids = Vec::new();
        for resume in &RESUMES[..3] {
            let record: CandidateRecord = NewApplication {
                full_name: "Postulante".to_string(),
                email: "p@example.com".to_string(),
                phone: None,
                resume_text: Some(resume.to_string()),
                process_id: None,
            }
            .into_record();
            ids.push(records.insert_candidate(record).await.unwrap().id);
        }
        let references: Vec<CandidateRef> = ids.iter().map(|id| CandidateRef::Id(*id)).collect();

        let token = CancellationToken::new();
        let running = {
            let orchestrator = orchestrator.clone();
            let token = token.clone();
            let references = references.clone();
            let options = BatchOptions {
                force: false,
                concurrency: 1,
            };
            tokio::spawn(async move { orchestrator.evaluate_all(&references, options, &token).await })
        };

        evaluations.entered.notified().await;
        token.cancel();
        evaluations.release.notify_one();

        let report = running.await.unwrap().unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.cancelled, 2);
        assert!(evaluations.get(ids[0]).await.unwrap().is_some());
        assert!(evaluations.get(ids[1]).await.unwrap().is_none());
    }
}
