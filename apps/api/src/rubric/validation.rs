use std::collections::HashSet;

use crate::rubric::models::{CategoryKey, ScoringConfig};
use crate::scoring::matcher::normalize_text;

const MAX_MULTIPLIER: f64 = 10.0;

/// Structural checks run before a configuration can become active.
/// Returns every problem found rather than stopping at the first.
pub fn validate_scoring_config(config: &ScoringConfig) -> Vec<String> {
    let mut problems = Vec::new();

    for key in CategoryKey::ALL {
        let Some(category) = config.categories.get(&key) else {
            problems.push(format!("category '{key}' is missing"));
            continue;
        };

        if category.name.trim().is_empty() {
            problems.push(format!("category '{key}' needs a name"));
        }

        let mut seen = HashSet::new();
        for keyword in &category.keywords {
            let normalized = normalize_text(keyword);
            if normalized.is_empty() {
                problems.push(format!("category '{key}' contains a blank keyword"));
            } else if !seen.insert(normalized) {
                problems.push(format!(
                    "category '{key}' lists keyword '{}' more than once",
                    keyword.trim()
                ));
            }
        }
    }

    for (tier, multiplier) in &config.industry_multipliers {
        if !multiplier.is_finite() || *multiplier <= 0.0 || *multiplier > MAX_MULTIPLIER {
            problems.push(format!(
                "industry multiplier for '{}' must be in (0, {MAX_MULTIPLIER}], got {multiplier}",
                tier.label()
            ));
        }
    }

    if config.inference.potential_expected == 0 {
        problems.push("inference.potential_expected must be at least 1".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::defaults;
    use crate::rubric::models::IndustryTier;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_scoring_config(&defaults::scoring_config()).is_empty());
    }

    #[test]
    fn test_missing_category_reported() {
        let mut config = defaults::scoring_config();
        config.categories.remove(&CategoryKey::Biz);
        let problems = validate_scoring_config(&config);
        assert_eq!(problems, vec!["category 'biz' is missing".to_string()]);
    }

    #[test]
    fn test_duplicate_keywords_are_case_insensitive() {
        let mut config = defaults::scoring_config();
        if let Some(ops) = config.categories.get_mut(&CategoryKey::Ops) {
            ops.keywords = vec!["Tesorería".to_string(), "tesorería ".to_string()];
        }
        let problems = validate_scoring_config(&config);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("more than once"));
    }

    #[test]
    fn test_empty_keyword_list_is_allowed() {
        let mut config = defaults::scoring_config();
        if let Some(admin) = config.categories.get_mut(&CategoryKey::Admin) {
            admin.keywords.clear();
        }
        assert!(validate_scoring_config(&config).is_empty());
    }

    #[test]
    fn test_bad_multipliers_and_blank_keyword_all_reported() {
        let mut config = defaults::scoring_config();
        config
            .industry_multipliers
            .insert(IndustryTier::Tech, f64::NAN);
        config.industry_multipliers.insert(IndustryTier::Fintech, 0.0);
        if let Some(biz) = config.categories.get_mut(&CategoryKey::Biz) {
            biz.keywords.push("   ".to_string());
        }
        assert_eq!(validate_scoring_config(&config).len(), 3);
    }
}
