use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::access::{CallerRole, STAFF};
use crate::errors::{AppError, EvaluationError};
use crate::evaluation::batch::{BatchOptions, BatchReport};
use crate::evaluation::service::{EvaluationMode, EvaluationView};
use crate::models::candidate::CandidateRef;
use crate::scoring::models::EvaluationResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub resume_text: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Candidate ids or tracking codes.
    pub candidates: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

/// Runs a batch on its own task under a child of the shutdown token.
/// If this handler is dropped (client went away) the guard cancels the token,
/// so no further candidates start; those already in flight finish.
async fn run_batch<F, Fut>(state: &AppState, run: F) -> Result<BatchReport, AppError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = Result<BatchReport, EvaluationError>>
        + Send
        + 'static,
{
    let token = state.shutdown.child_token();
    let guard = token.clone().drop_guard();
    let report = tokio::spawn(run(token))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;
    guard.disarm();
    Ok(report)
}

fn batch_options(state: &AppState, force: bool) -> BatchOptions {
    BatchOptions {
        force,
        concurrency: state.config.batch_concurrency,
    }
}

/// GET /api/v1/evaluations/:candidate
/// Returns the stored evaluation with a staleness flag; never recomputes.
pub async fn handle_get_evaluation(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
) -> Result<Json<EvaluationView>, AppError> {
    caller.require(STAFF)?;
    let view = state
        .evaluations
        .evaluation(&CandidateRef::parse(&candidate))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/evaluations/:candidate/evaluate
/// Scores the candidate now and replaces its stored evaluation.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
) -> Result<Json<EvaluationResult>, AppError> {
    caller.require(STAFF)?;
    let outcome = state
        .evaluations
        .evaluate(&CandidateRef::parse(&candidate), EvaluationMode::Recompute)
        .await?;
    Ok(Json(outcome.into_result()))
}

/// POST /api/v1/evaluations/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    caller: CallerRole,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<EvaluationResult>, AppError> {
    caller.require(STAFF)?;
    Ok(Json(state.evaluations.preview(&req.resume_text).await?))
}

/// POST /api/v1/evaluations/batch
pub async fn handle_batch(
    State(state): State<AppState>,
    caller: CallerRole,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchReport>, AppError> {
    caller.require(STAFF)?;
    let references: Vec<CandidateRef> = req.candidates.iter().map(|c| CandidateRef::parse(c)).collect();
    let options = batch_options(&state, req.force);
    let batch = state.batch.clone();

    let report = run_batch(&state, move |token| async move {
        batch.evaluate_all(&references, options, &token).await
    })
    .await?;
    Ok(Json(report))
}

/// POST /api/v1/processes/:id/evaluate-all
pub async fn handle_evaluate_process(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(process_id): Path<Uuid>,
    Query(query): Query<ForceQuery>,
) -> Result<Json<BatchReport>, AppError> {
    caller.require(STAFF)?;
    let options = batch_options(&state, query.force);
    let batch = state.batch.clone();

    let report = run_batch(&state, move |token| async move {
        batch.evaluate_process(process_id, options, &token).await
    })
    .await?;
    Ok(Json(report))
}
