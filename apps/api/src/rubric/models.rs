use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rubric::defaults;

/// The three fixed evaluation dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKey {
    Admin,
    Ops,
    Biz,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 3] = [CategoryKey::Admin, CategoryKey::Ops, CategoryKey::Biz];

    pub const fn as_str(self) -> &'static str {
        match self {
            CategoryKey::Admin => "admin",
            CategoryKey::Ops => "ops",
            CategoryKey::Biz => "biz",
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Industry buckets. Declaration order is detection precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndustryTier {
    Fintech,
    Tech,
    Traditional,
    General,
}

impl IndustryTier {
    pub const fn label(self) -> &'static str {
        match self {
            IndustryTier::Fintech => "Fintech (Ideal)",
            IndustryTier::Tech => "Tech / Digital",
            IndustryTier::Traditional => "Traditional",
            IndustryTier::General => "General",
        }
    }
}

/// Keyword set for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Keyword lists feeding the inference metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub corporate_scope_keywords: Vec<String>,
    #[serde(default)]
    pub potential_keywords: Vec<String>,
    /// Number of potential keywords that already saturates `potential_score` at 100.
    #[serde(default = "defaults::potential_expected")]
    pub potential_expected: u32,
}

/// Full option set an administrator can write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub categories: BTreeMap<CategoryKey, CategoryConfig>,
    #[serde(default)]
    pub industry_multipliers: BTreeMap<IndustryTier, f64>,
    #[serde(default = "defaults::inference")]
    pub inference: InferenceConfig,
    #[serde(default = "defaults::industry_keywords")]
    pub industry_keywords: BTreeMap<IndustryTier, Vec<String>>,
}

impl ScoringConfig {
    /// Multiplier for a tier; tiers without an entry are neutral.
    pub fn multiplier(&self, tier: IndustryTier) -> f64 {
        self.industry_multipliers.get(&tier).copied().unwrap_or(1.0)
    }
}

/// Monotonic stamp of the configuration that produced an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigVersion(pub i64);

impl ConfigVersion {
    pub const INITIAL: ConfigVersion = ConfigVersion(1);

    pub fn next(self) -> ConfigVersion {
        ConfigVersion(self.0 + 1)
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The configuration currently used for scoring, with its version stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveConfig {
    pub version: ConfigVersion,
    pub activated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub config: ScoringConfig,
}
