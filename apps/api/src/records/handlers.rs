use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access::{CallerRole, ADMIN_ONLY, STAFF};
use crate::errors::AppError;
use crate::evaluation::service::StoreChange;
use crate::models::candidate::{CandidateRecord, CandidateRef, CandidateState, NewApplication};
use crate::models::comment::{Comment, NewComment};
use crate::models::process::{NewProcess, ProcessRecord, ProcessState, ProcessSummary};
use crate::records::export::export_csv;
use crate::records::views::{
    dashboard_stats, rank_candidates, track_application, ApplicationTracking, CandidateRanking,
    DashboardStats,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CandidateStateUpdate {
    pub state: CandidateState,
}

#[derive(Debug, Deserialize)]
pub struct ProcessStateUpdate {
    pub state: ProcessState,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub process_id: Option<Uuid>,
    /// Top-N after ranking.
    pub limit: Option<usize>,
}

async fn find_candidate(state: &AppState, raw: &str) -> Result<CandidateRecord, AppError> {
    let reference = CandidateRef::parse(raw);
    state
        .records
        .resolve(&reference)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {reference} not found")))
}

async fn find_process(state: &AppState, id: Uuid) -> Result<ProcessRecord, AppError> {
    state
        .records
        .process(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Process {id} not found")))
}

async fn summarize(state: &AppState, process: ProcessRecord) -> Result<ProcessSummary, AppError> {
    let candidates = state.records.candidates_for_process(process.id).await?;
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let evaluated = state.evaluation_store.list_for(&ids).await?.len();
    Ok(ProcessSummary {
        process,
        applications: candidates.len(),
        evaluated,
    })
}

async fn ranked(
    state: &AppState,
    candidates: Vec<CandidateRecord>,
) -> Result<Vec<CandidateRanking>, AppError> {
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let evaluations = state.evaluation_store.list_for(&ids).await?;
    let active = state.rubric.get_active().await?;
    Ok(rank_candidates(candidates, &evaluations, active.version))
}

// ────────────────────────────────────────────────────────────────────────────
// Candidates
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/candidates
/// Public application submission.
pub async fn handle_submit_application(
    State(state): State<AppState>,
    Json(application): Json<NewApplication>,
) -> Result<(StatusCode, Json<CandidateRecord>), AppError> {
    application.validate().map_err(AppError::Validation)?;

    if let Some(process_id) = application.process_id {
        let process = find_process(&state, process_id).await?;
        if !process.state.accepts_applications() {
            return Err(AppError::Validation(format!(
                "Process {} is {} and no longer accepts applications",
                process.code, process.state
            )));
        }
    }

    let record = state
        .records
        .insert_candidate(application.into_record())
        .await?;
    info!(candidate = %record.tracking_code, "application received");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/candidates?process_id=&limit=
/// Candidates ranked by average score, best first.
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    caller: CallerRole,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<CandidateRanking>>, AppError> {
    caller.require(STAFF)?;
    let candidates = match query.process_id {
        Some(process_id) => {
            find_process(&state, process_id).await?;
            state.records.candidates_for_process(process_id).await?
        }
        None => state.records.candidates().await?,
    };
    let mut ranking = ranked(&state, candidates).await?;
    if let Some(limit) = query.limit {
        ranking.truncate(limit);
    }
    Ok(Json(ranking))
}

/// GET /api/v1/track/:tracking_code
/// Public status lookup for applicants. Tracking codes only, never ids.
pub async fn handle_track_application(
    State(state): State<AppState>,
    Path(tracking_code): Path<String>,
) -> Result<Json<ApplicationTracking>, AppError> {
    let candidate = state
        .records
        .candidate_by_code(tracking_code.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
    let process = match candidate.process_id {
        Some(id) => state.records.process(id).await?,
        None => None,
    };
    let evaluated = state.evaluation_store.get(candidate.id).await?.is_some();
    Ok(Json(track_application(candidate, process, evaluated)))
}

/// GET /api/v1/dashboard/stats
pub async fn handle_dashboard_stats(
    State(state): State<AppState>,
    caller: CallerRole,
) -> Result<Json<DashboardStats>, AppError> {
    caller.require(STAFF)?;
    let candidates = state.records.candidates().await?;
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let evaluations = state.evaluation_store.list_for(&ids).await?;
    let processes = state.records.processes().await?;
    Ok(Json(dashboard_stats(&candidates, &evaluations, &processes)))
}

/// GET /api/v1/candidates/:candidate
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
) -> Result<Json<CandidateRecord>, AppError> {
    caller.require(STAFF)?;
    Ok(Json(find_candidate(&state, &candidate).await?))
}

/// PATCH /api/v1/candidates/:candidate/state
pub async fn handle_update_candidate_state(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
    Json(req): Json<CandidateStateUpdate>,
) -> Result<Json<CandidateRecord>, AppError> {
    caller.require(STAFF)?;
    let existing = find_candidate(&state, &candidate).await?;
    let updated = state
        .records
        .set_candidate_state(existing.id, req.state)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate} not found")))?;

    info!(candidate = %updated.tracking_code, from = %existing.state, to = %updated.state, "candidate state changed");
    state.evaluations.notify(StoreChange::StateChanged {
        candidate_id: updated.id,
        state: updated.state,
    });
    Ok(Json(updated))
}

/// DELETE /api/v1/candidates/:candidate
/// Erasure: removes the candidate, its comments and its evaluation.
pub async fn handle_erase_candidate(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
) -> Result<StatusCode, AppError> {
    caller.require(ADMIN_ONLY)?;
    state
        .evaluations
        .erase(&CandidateRef::parse(&candidate))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/candidates/:candidate/comments
pub async fn handle_list_comments(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    caller.require(STAFF)?;
    let record = find_candidate(&state, &candidate).await?;
    Ok(Json(state.records.comments(record.id).await?))
}

/// POST /api/v1/candidates/:candidate/comments
pub async fn handle_add_comment(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(candidate): Path<String>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    caller.require(STAFF)?;
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("Comment text cannot be empty".to_string()));
    }
    if req.author.trim().is_empty() {
        return Err(AppError::Validation("Comment author cannot be empty".to_string()));
    }
    let record = find_candidate(&state, &candidate).await?;
    let comment = state
        .records
        .append_comment(req.into_comment(record.id))
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

// ────────────────────────────────────────────────────────────────────────────
// Processes
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/processes
pub async fn handle_create_process(
    State(state): State<AppState>,
    caller: CallerRole,
    Json(req): Json<NewProcess>,
) -> Result<(StatusCode, Json<ProcessRecord>), AppError> {
    caller.require(ADMIN_ONLY)?;
    req.validate().map_err(AppError::Validation)?;
    let process = state.records.insert_process(req.into_record()).await?;
    info!(process = %process.code, "process created");
    Ok((StatusCode::CREATED, Json(process)))
}

/// GET /api/v1/processes
pub async fn handle_list_processes(
    State(state): State<AppState>,
    caller: CallerRole,
) -> Result<Json<Vec<ProcessSummary>>, AppError> {
    caller.require(STAFF)?;
    let mut summaries = Vec::new();
    for process in state.records.processes().await? {
        summaries.push(summarize(&state, process).await?);
    }
    Ok(Json(summaries))
}

/// GET /api/v1/processes/:id
pub async fn handle_get_process(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessSummary>, AppError> {
    caller.require(STAFF)?;
    let process = find_process(&state, id).await?;
    Ok(Json(summarize(&state, process).await?))
}

/// PATCH /api/v1/processes/:id/state
pub async fn handle_update_process_state(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(id): Path<Uuid>,
    Json(req): Json<ProcessStateUpdate>,
) -> Result<Json<ProcessRecord>, AppError> {
    caller.require(STAFF)?;
    let process = state
        .records
        .set_process_state(id, req.state)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Process {id} not found")))?;
    info!(process = %process.code, state = %process.state, "process state changed");
    Ok(Json(process))
}

/// GET /api/v1/processes/:id/candidates
/// Ranked like the global listing.
pub async fn handle_process_candidates(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CandidateRanking>>, AppError> {
    caller.require(STAFF)?;
    find_process(&state, id).await?;
    let candidates = state.records.candidates_for_process(id).await?;
    Ok(Json(ranked(&state, candidates).await?))
}

/// GET /api/v1/processes/:id/export
pub async fn handle_export_process(
    State(state): State<AppState>,
    caller: CallerRole,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    caller.require(STAFF)?;
    let process = find_process(&state, id).await?;
    let candidates = state.records.candidates_for_process(id).await?;
    let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
    let mut evaluations = state.evaluation_store.list_for(&ids).await?;

    let rows: Vec<_> = candidates
        .into_iter()
        .map(|c| {
            let evaluation = evaluations.remove(&c.id);
            (c, evaluation)
        })
        .collect();
    let body = export_csv(&rows)?;

    let disposition = format!("attachment; filename=\"{}.csv\"", process.code);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
