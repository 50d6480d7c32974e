use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rubric::models::{CategoryKey, ConfigVersion, IndustryTier};

/// Outcome of scoring one résumé against one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub score: u8, // 0 – 100
    pub found: Vec<String>,
    pub missing: Vec<String>,
    pub reasoning: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileType {
    #[serde(rename = "Híbrido (Gestión + Operación)")]
    Hybrid,
    #[serde(rename = "Ejecutor Hands-On")]
    HandsOn,
    #[serde(rename = "Estratégico / Delegador")]
    Strategic,
    #[serde(rename = "Corporativo Senior / Overqualified")]
    Corporate,
}

impl ProfileType {
    pub const fn label(self) -> &'static str {
        match self {
            ProfileType::Hybrid => "Híbrido (Gestión + Operación)",
            ProfileType::HandsOn => "Ejecutor Hands-On",
            ProfileType::Strategic => "Estratégico / Delegador",
            ProfileType::Corporate => "Corporativo Senior / Overqualified",
        }
    }

    /// Profiles whose strengths sit away from day-to-day execution.
    pub const fn is_strategic(self) -> bool {
        matches!(self, ProfileType::Strategic | ProfileType::Corporate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RetentionRisk {
    Bajo,
    Medio,
    Alto,
}

impl RetentionRisk {
    pub const fn label(self) -> &'static str {
        match self {
            RetentionRisk::Bajo => "Bajo",
            RetentionRisk::Medio => "Medio",
            RetentionRisk::Alto => "Alto",
        }
    }
}

/// Derived profile metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub profile_type: ProfileType,
    pub hands_on_index: u8,
    pub potential_score: u8,
    pub retention_risk: RetentionRisk,
    pub risk_warning: String,
    pub scope_intensity: u32,
    pub industry_tier: IndustryTier,
}

/// The single live evaluation of a candidate.
///
/// `score_promedio` is always derived from `fits`; there is no way to set it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub candidate_id: Uuid,
    pub fits: BTreeMap<CategoryKey, CategoryResult>,
    pub inference: InferenceResult,
    score_promedio: u8,
    pub config_version: ConfigVersion,
    pub evaluated_at: DateTime<Utc>,
    /// True when served from the store without recomputation.
    #[serde(default)]
    pub cached: bool,
}

impl EvaluationResult {
    pub fn new(
        candidate_id: Uuid,
        fits: BTreeMap<CategoryKey, CategoryResult>,
        inference: InferenceResult,
        config_version: ConfigVersion,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        let score_promedio = average_score(&fits);
        Self {
            candidate_id,
            fits,
            inference,
            score_promedio,
            config_version,
            evaluated_at,
            cached: false,
        }
    }

    pub fn score_promedio(&self) -> u8 {
        self.score_promedio
    }

    pub fn served_from_store(mut self) -> Self {
        self.cached = true;
        self
    }
}

/// Rounded (half-up) mean of the category scores; 0 when there are none.
pub fn average_score(fits: &BTreeMap<CategoryKey, CategoryResult>) -> u8 {
    if fits.is_empty() {
        return 0;
    }
    let count = fits.len() as u32;
    let sum: u32 = fits.values().map(|fit| u32::from(fit.score)).sum();
    ((2 * sum + count) / (2 * count)) as u8
}
