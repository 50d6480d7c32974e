//! Inference Engine: derives profile metrics from category scores and résumé text.
//!
//! Every rule here is deterministic: same text, same scores, same config → same result.

use std::collections::BTreeMap;

use crate::rubric::models::{CategoryKey, IndustryTier, InferenceConfig, ScoringConfig};
use crate::scoring::matcher::{normalize_text, ratio_score, ResumeText};
use crate::scoring::models::{InferenceResult, ProfileType, RetentionRisk};

/// Points by which one category must lead the other two to define the profile.
pub const DOMINANCE_MARGIN: u8 = 15;

const OPS_WEIGHT: f64 = 0.6;
const ADMIN_WEIGHT: f64 = 0.4;

const SENIOR_RANK: u8 = 3;
const CORPORATE_SCOPE: u32 = 3;
const DELEGATOR_HANDS_ON: u8 = 60;
const LOW_HANDS_ON: u8 = 40;

/// Seniority ladder, matched as whole words. Highest matching rank wins.
const TITLE_RANKS: &[(&str, u8)] = &[
    ("jefe", 3),
    ("gerente", 4),
    ("subgerente", 3),
    ("director", 4),
    ("analista senior", 2),
    ("controller", 3),
    ("contador auditor", 2),
    ("encargado", 2),
    ("lider", 2),
    ("líder", 2),
    ("head", 4),
    ("lead", 3),
];

// ────────────────────────────────────────────────────────────────────────────
// Individual signals
// ────────────────────────────────────────────────────────────────────────────

/// Industry tier of the résumé plus the multiplier configured for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndustrySignal {
    pub tier: IndustryTier,
    pub multiplier: f64,
}

/// First tier (fintech, tech, traditional) whose keyword list hits the text; else general.
pub fn detect_industry(resume: &ResumeText, config: &ScoringConfig) -> IndustrySignal {
    let tier = config
        .industry_keywords
        .iter()
        .filter(|(tier, _)| **tier != IndustryTier::General)
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|kw| resume.contains(&normalize_text(kw)))
        })
        .map(|(tier, _)| *tier)
        .unwrap_or(IndustryTier::General);

    IndustrySignal {
        tier,
        multiplier: config.multiplier(tier),
    }
}

/// `clamp(round((0.6·ops + 0.4·admin) · multiplier), 0, 100)`.
pub fn hands_on_index(ops: u8, admin: u8, multiplier: f64) -> u8 {
    let raw = (OPS_WEIGHT * f64::from(ops) + ADMIN_WEIGHT * f64::from(admin)) * multiplier;
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

pub fn title_rank(resume: &ResumeText) -> u8 {
    TITLE_RANKS
        .iter()
        .filter(|(title, _)| resume.contains_word(title))
        .map(|(_, rank)| *rank)
        .max()
        .unwrap_or(0)
}

/// Number of distinct corporate-scope keywords present.
pub fn scope_intensity(resume: &ResumeText, inference: &InferenceConfig) -> u32 {
    resume.matches(&inference.corporate_scope_keywords).len() as u32
}

pub fn potential_score(resume: &ResumeText, inference: &InferenceConfig) -> u8 {
    let found = resume.matches(&inference.potential_keywords).len();
    let expected = inference.potential_expected.max(1) as usize;
    ratio_score(found.min(expected), expected)
}

/// The category whose score beats both others by at least `margin`, if any.
pub fn dominant_category(scores: &BTreeMap<CategoryKey, u8>, margin: u8) -> Option<CategoryKey> {
    CategoryKey::ALL.into_iter().find(|key| {
        let lead = score_of(scores, *key);
        CategoryKey::ALL
            .into_iter()
            .filter(|other| other != key)
            .all(|other| lead >= score_of(scores, other).saturating_add(margin))
    })
}

fn score_of(scores: &BTreeMap<CategoryKey, u8>, key: CategoryKey) -> u8 {
    scores.get(&key).copied().unwrap_or(0)
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

pub fn classify_profile(
    scores: &BTreeMap<CategoryKey, u8>,
    hands_on: u8,
    rank: u8,
    scope: u32,
) -> ProfileType {
    if rank >= SENIOR_RANK && scope >= CORPORATE_SCOPE {
        return ProfileType::Corporate;
    }
    match dominant_category(scores, DOMINANCE_MARGIN) {
        Some(CategoryKey::Ops) | Some(CategoryKey::Admin) => return ProfileType::HandsOn,
        Some(CategoryKey::Biz) => return ProfileType::Strategic,
        None => {}
    }
    if rank >= SENIOR_RANK && hands_on < DELEGATOR_HANDS_ON {
        return ProfileType::Strategic;
    }
    ProfileType::Hybrid
}

pub fn classify_retention(profile: ProfileType, hands_on: u8) -> RetentionRisk {
    match (profile.is_strategic(), hands_on < LOW_HANDS_ON) {
        (true, true) => RetentionRisk::Alto,
        (true, false) | (false, true) => RetentionRisk::Medio,
        (false, false) => RetentionRisk::Bajo,
    }
}

pub fn risk_warning(profile: ProfileType, risk: RetentionRisk, hands_on: u8) -> String {
    match risk {
        RetentionRisk::Alto => format!(
            "{} profile with hands-on index {hands_on}: likely to delegate operational work and leave a hands-on role early.",
            profile.label()
        ),
        RetentionRisk::Medio if profile.is_strategic() => format!(
            "{} profile: confirm appetite for day-to-day execution.",
            profile.label()
        ),
        RetentionRisk::Medio => format!(
            "Hands-on index {hands_on} is low for an execution-heavy role: check recent operational exposure."
        ),
        RetentionRisk::Bajo => "Fit is consistent with a hands-on role.".to_string(),
    }
}

/// Runs every inference rule over one résumé.
pub fn infer(
    resume: &ResumeText,
    scores: &BTreeMap<CategoryKey, u8>,
    config: &ScoringConfig,
) -> InferenceResult {
    let industry = detect_industry(resume, config);
    let hands_on = hands_on_index(
        score_of(scores, CategoryKey::Ops),
        score_of(scores, CategoryKey::Admin),
        industry.multiplier,
    );
    let rank = title_rank(resume);
    let scope = scope_intensity(resume, &config.inference);
    let profile = classify_profile(scores, hands_on, rank, scope);
    let risk = classify_retention(profile, hands_on);

    InferenceResult {
        profile_type: profile,
        hands_on_index: hands_on,
        potential_score: potential_score(resume, &config.inference),
        retention_risk: risk,
        risk_warning: risk_warning(profile, risk, hands_on),
        scope_intensity: scope,
        industry_tier: industry.tier,
    }
}
