//! Category Matcher: scores résumé text against one category's keyword set.
//!
//! Algorithm:
//! 1. Normalize text and keywords: lowercase, whitespace runs collapsed to one space.
//! 2. A keyword is found when its normalized form occurs anywhere in the text.
//! 3. score = round(100 × |found| / |keywords|), 0 for an empty keyword list.
//!
//! `found` and `missing` keep configuration order. Repeated keywords count once.

use std::collections::HashSet;

use crate::errors::EvaluationError;
use crate::rubric::models::CategoryConfig;
use crate::scoring::models::CategoryResult;

const REASONING_PREVIEW: usize = 3;
const QUESTION_PREVIEW: usize = 2;

/// Lowercases and collapses whitespace so line breaks inside a phrase still match.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Résumé text normalized once per evaluation.
#[derive(Debug, Clone)]
pub struct ResumeText {
    normalized: String,
}

impl ResumeText {
    pub fn new(raw: &str) -> Self {
        Self {
            normalized: normalize_text(raw),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Substring containment of an already-normalized keyword.
    pub fn contains(&self, normalized_keyword: &str) -> bool {
        !normalized_keyword.is_empty() && self.normalized.contains(normalized_keyword)
    }

    /// Like `contains`, but the match must not sit inside a longer word.
    pub fn contains_word(&self, normalized_keyword: &str) -> bool {
        if normalized_keyword.is_empty() {
            return false;
        }
        self.normalized
            .match_indices(normalized_keyword)
            .any(|(start, matched)| {
                let before = self.normalized[..start].chars().next_back();
                let after = self.normalized[start + matched.len()..].chars().next();
                !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
            })
    }

    /// Keywords (raw form) that occur in the text, in list order, deduplicated.
    pub fn matches<'a>(&self, keywords: &'a [String]) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        keywords
            .iter()
            .filter(|kw| {
                let normalized = normalize_text(kw);
                self.contains(&normalized) && seen.insert(normalized)
            })
            .map(|kw| kw.trim())
            .collect()
    }
}

/// Integer percentage `round(100 * hits / total)` with half-up rounding.
pub fn ratio_score(hits: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let hits = hits.min(total) as u64;
    let total = total as u64;
    ((200 * hits + total) / (2 * total)) as u8
}

pub fn match_category(
    resume: &ResumeText,
    category: &CategoryConfig,
) -> Result<CategoryResult, EvaluationError> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for keyword in &category.keywords {
        let normalized = normalize_text(keyword);
        if normalized.is_empty() {
            return Err(EvaluationError::Configuration(format!(
                "category '{}' contains a blank keyword",
                category.name
            )));
        }
        if !seen.insert(normalized.clone()) {
            continue;
        }
        if resume.contains(&normalized) {
            found.push(keyword.trim().to_string());
        } else {
            missing.push(keyword.trim().to_string());
        }
    }

    let total = found.len() + missing.len();
    let score = ratio_score(found.len(), total);

    let mut reasoning = format!("Detected {}/{} concepts.", found.len(), total);
    if !found.is_empty() {
        let preview: Vec<&str> = found
            .iter()
            .take(REASONING_PREVIEW)
            .map(String::as_str)
            .collect();
        reasoning.push_str(&format!(" Evidence: {}.", preview.join(", ")));
    }

    let questions = if missing.is_empty() {
        vec![]
    } else {
        let preview: Vec<&str> = missing
            .iter()
            .take(QUESTION_PREVIEW)
            .map(String::as_str)
            .collect();
        vec![format!(
            "Missing key concepts: {}. Probe in the interview.",
            preview.join(", ")
        )]
    };

    Ok(CategoryResult {
        score,
        found,
        missing,
        reasoning,
        questions,
    })
}
