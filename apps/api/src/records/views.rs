//! Read models derived on request from candidate records and stored evaluations:
//! the recruiter ranking, dashboard counters and the applicant tracking view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::evaluation::store::is_stale;
use crate::models::candidate::{CandidateRecord, CandidateState};
use crate::models::process::ProcessRecord;
use crate::rubric::models::{ConfigVersion, IndustryTier};
use crate::scoring::models::{EvaluationResult, ProfileType, RetentionRisk};

/// One row of the recruiter ranking. Score fields are `None` until evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRanking {
    pub id: Uuid,
    pub tracking_code: String,
    pub full_name: String,
    pub email: String,
    pub state: CandidateState,
    pub submitted_at: DateTime<Utc>,
    pub process_id: Option<Uuid>,
    pub score_promedio: Option<u8>,
    pub hands_on_index: Option<u8>,
    pub retention_risk: Option<RetentionRisk>,
    pub profile_type: Option<ProfileType>,
    pub industry_tier: Option<IndustryTier>,
    pub stale: bool,
}

impl CandidateRanking {
    fn new(candidate: CandidateRecord, evaluation: Option<&EvaluationResult>, active: ConfigVersion) -> Self {
        Self {
            id: candidate.id,
            tracking_code: candidate.tracking_code,
            full_name: candidate.full_name,
            email: candidate.email,
            state: candidate.state,
            submitted_at: candidate.submitted_at,
            process_id: candidate.process_id,
            score_promedio: evaluation.map(|e| e.score_promedio()),
            hands_on_index: evaluation.map(|e| e.inference.hands_on_index),
            retention_risk: evaluation.map(|e| e.inference.retention_risk),
            profile_type: evaluation.map(|e| e.inference.profile_type),
            industry_tier: evaluation.map(|e| e.inference.industry_tier),
            stale: evaluation.is_some_and(|e| is_stale(e, active)),
        }
    }
}

/// Highest `score_promedio` first; unevaluated candidates last. Ties keep the
/// order of `candidates`.
pub fn rank_candidates(
    candidates: Vec<CandidateRecord>,
    evaluations: &HashMap<Uuid, EvaluationResult>,
    active: ConfigVersion,
) -> Vec<CandidateRanking> {
    let mut ranking: Vec<CandidateRanking> = candidates
        .into_iter()
        .map(|c| {
            let evaluation = evaluations.get(&c.id);
            CandidateRanking::new(c, evaluation, active)
        })
        .collect();
    ranking.sort_by(|a, b| b.score_promedio.cmp(&a.score_promedio));
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_candidates: usize,
    pub evaluated: usize,
    pub pending: usize,
    /// Mean `score_promedio` of evaluated candidates, one decimal; 0 when none.
    pub average_score: f64,
    pub high_risk: usize,
    pub active_processes: usize,
}

pub fn dashboard_stats(
    candidates: &[CandidateRecord],
    evaluations: &HashMap<Uuid, EvaluationResult>,
    processes: &[ProcessRecord],
) -> DashboardStats {
    let scored: Vec<&EvaluationResult> = candidates
        .iter()
        .filter_map(|c| evaluations.get(&c.id))
        .collect();

    let average_score = if scored.is_empty() {
        0.0
    } else {
        let sum: u32 = scored.iter().map(|e| u32::from(e.score_promedio())).sum();
        (f64::from(sum) / scored.len() as f64 * 10.0).round() / 10.0
    };

    DashboardStats {
        total_candidates: candidates.len(),
        evaluated: scored.len(),
        pending: candidates.len() - scored.len(),
        average_score,
        high_risk: scored
            .iter()
            .filter(|e| e.inference.retention_risk == RetentionRisk::Alto)
            .count(),
        active_processes: processes
            .iter()
            .filter(|p| p.state.accepts_applications())
            .count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Received,
    InEvaluation,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Received => "Recibido - Pendiente de revisión",
            ApplicationStatus::InEvaluation => "En evaluación",
        }
    }
}

/// What an applicant may see about their own submission. No contact data,
/// scores or reviewer state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationTracking {
    pub tracking_code: String,
    pub full_name: String,
    pub process_code: Option<String>,
    pub role_title: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
}

pub fn track_application(
    candidate: CandidateRecord,
    process: Option<ProcessRecord>,
    evaluated: bool,
) -> ApplicationTracking {
    let status = if evaluated {
        ApplicationStatus::InEvaluation
    } else {
        ApplicationStatus::Received
    };
    let (process_code, role_title) = match process {
        Some(p) => (Some(p.code), Some(p.role_title)),
        None => (None, None),
    };
    ApplicationTracking {
        tracking_code: candidate.tracking_code,
        full_name: candidate.full_name,
        process_code,
        role_title,
        submitted_at: candidate.submitted_at,
        status,
        status_label: status.label(),
    }
}
