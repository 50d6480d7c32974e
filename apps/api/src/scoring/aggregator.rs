//! Score Aggregator: runs the matcher for every category, then inference,
//! and assembles one [`EvaluationResult`].
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`; the keyword scorer is the only backend.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::EvaluationError;
use crate::rubric::models::{ActiveConfig, CategoryKey, ScoringConfig};
use crate::rubric::validation::validate_scoring_config;
use crate::scoring::inference;
use crate::scoring::matcher::{match_category, ResumeText};
use crate::scoring::models::{CategoryResult, EvaluationResult};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Pure scoring backend. Implementations never touch storage.
pub trait CandidateScorer: Send + Sync {
    fn backend(&self) -> &'static str;

    fn score(
        &self,
        candidate_id: Uuid,
        resume_text: &str,
        config: &ActiveConfig,
    ) -> Result<EvaluationResult, EvaluationError>;
}

/// Deterministic keyword scorer.
pub struct KeywordScorer;

impl CandidateScorer for KeywordScorer {
    fn backend(&self) -> &'static str {
        "keyword"
    }

    fn score(
        &self,
        candidate_id: Uuid,
        resume_text: &str,
        config: &ActiveConfig,
    ) -> Result<EvaluationResult, EvaluationError> {
        evaluate_text(candidate_id, resume_text, config)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregation
// ────────────────────────────────────────────────────────────────────────────

fn ensure_usable(config: &ScoringConfig) -> Result<(), EvaluationError> {
    let problems = validate_scoring_config(config);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(EvaluationError::Configuration(problems.join("; ")))
    }
}

pub fn evaluate_text(
    candidate_id: Uuid,
    resume_text: &str,
    active: &ActiveConfig,
) -> Result<EvaluationResult, EvaluationError> {
    ensure_usable(&active.config)?;

    let resume = ResumeText::new(resume_text);
    if resume.is_blank() {
        return Err(EvaluationError::MissingInput {
            candidate: candidate_id.to_string(),
        });
    }

    let mut fits: BTreeMap<CategoryKey, CategoryResult> = BTreeMap::new();
    for key in CategoryKey::ALL {
        let category = active.config.categories.get(&key).ok_or_else(|| {
            EvaluationError::Configuration(format!("category '{key}' is not configured"))
        })?;
        fits.insert(key, match_category(&resume, category)?);
    }

    let scores: BTreeMap<CategoryKey, u8> = fits.iter().map(|(k, fit)| (*k, fit.score)).collect();
    let inference = inference::infer(&resume, &scores, &active.config);

    Ok(EvaluationResult::new(
        candidate_id,
        fits,
        inference,
        active.version,
        Utc::now(),
    ))
}
