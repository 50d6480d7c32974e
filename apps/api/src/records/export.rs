//! CSV export of a process's candidates with their evaluation summary.
//! Candidates without an evaluation get empty score columns.

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::models::candidate::CandidateRecord;
use crate::scoring::models::EvaluationResult;

#[derive(Serialize)]
struct ExportRow<'a> {
    tracking_code: &'a str,
    full_name: &'a str,
    email: &'a str,
    phone: &'a str,
    submitted_at: String,
    state: &'static str,
    score_promedio: Option<u8>,
    hands_on_index: Option<u8>,
    retention_risk: Option<&'static str>,
    profile_type: Option<&'static str>,
}

impl<'a> ExportRow<'a> {
    fn new(candidate: &'a CandidateRecord, evaluation: Option<&EvaluationResult>) -> Self {
        Self {
            tracking_code: &candidate.tracking_code,
            full_name: &candidate.full_name,
            email: &candidate.email,
            phone: candidate.phone.as_deref().unwrap_or(""),
            submitted_at: candidate.submitted_at.to_rfc3339(),
            state: candidate.state.as_str(),
            score_promedio: evaluation.map(|e| e.score_promedio()),
            hands_on_index: evaluation.map(|e| e.inference.hands_on_index),
            retention_risk: evaluation.map(|e| e.inference.retention_risk.label()),
            profile_type: evaluation.map(|e| e.inference.profile_type.label()),
        }
    }
}

pub fn export_csv(rows: &[(CandidateRecord, Option<EvaluationResult>)]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (candidate, evaluation) in rows {
        writer.serialize(ExportRow::new(candidate, evaluation.as_ref()))?;
    }
    if rows.is_empty() {
        writer.write_record([
            "tracking_code",
            "full_name",
            "email",
            "phone",
            "submitted_at",
            "state",
            "score_promedio",
            "hands_on_index",
            "retention_risk",
            "profile_type",
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV export: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::candidate::NewApplication;
    use crate::rubric::defaults;
    use crate::rubric::models::{ActiveConfig, ConfigVersion};
    use crate::scoring::aggregator::evaluate_text;

    fn candidate(name: &str, phone: Option<&str>) -> CandidateRecord {
        NewApplication {
            full_name: name.to_string(),
            email: "c@example.com".to_string(),
            phone: phone.map(str::to_string),
            resume_text: Some("tesorería".to_string()),
            process_id: None,
        }
        .into_record()
    }

    #[test]
    fn test_export_reads_summary_fields_verbatim() {
        let evaluated = candidate("Ana, Pérez", Some("+56 9 1234"));
        let pending = candidate("Bruno", None);
        let active = ActiveConfig {
            version: ConfigVersion::INITIAL,
            activated_at: Utc::now(),
            config: defaults::scoring_config(),
        };
        let result = evaluate_text(evaluated.id, "flujo de caja y tesorería", &active).unwrap();

        let csv = export_csv(&[
            (evaluated.clone(), Some(result.clone())),
            (pending.clone(), None),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "tracking_code,full_name,email,phone,submitted_at,state,score_promedio,hands_on_index,retention_risk,profile_type"
        );
        assert!(lines[1].starts_with(&format!("{},\"Ana, Pérez\"", evaluated.tracking_code)));
        assert!(lines[1].ends_with(&format!(
            ",{},{},{},{}",
            result.score_promedio(),
            result.inference.hands_on_index,
            result.inference.retention_risk.label(),
            result.inference.profile_type.label()
        )));
        assert!(lines[2].ends_with(",new,,,,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let csv = export_csv(&[]).unwrap();
        assert!(csv.starts_with("tracking_code,"));
        assert_eq!(csv.lines().count(), 1);
    }
}
