use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow position of a candidate inside a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateState {
    New,
    Received,
    InReview,
    Evaluated,
    Interview,
    Finalist,
    Selected,
    Rejected,
    Discarded,
}

impl CandidateState {
    pub const fn as_str(self) -> &'static str {
        match self {
            CandidateState::New => "new",
            CandidateState::Received => "received",
            CandidateState::InReview => "in-review",
            CandidateState::Evaluated => "evaluated",
            CandidateState::Interview => "interview",
            CandidateState::Finalist => "finalist",
            CandidateState::Selected => "selected",
            CandidateState::Rejected => "rejected",
            CandidateState::Discarded => "discarded",
        }
    }

    /// Closed candidates keep whatever evaluation they have and are never rescored.
    pub const fn is_closed(self) -> bool {
        matches!(self, CandidateState::Rejected | CandidateState::Discarded)
    }

    /// States that a successful evaluation advances to `Evaluated`.
    pub const AWAITING_EVALUATION: [CandidateState; 2] = [CandidateState::New, CandidateState::Received];

    pub fn awaits_evaluation(self) -> bool {
        Self::AWAITING_EVALUATION.contains(&self)
    }
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateState {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let state = match raw {
            "new" => CandidateState::New,
            "received" => CandidateState::Received,
            "in-review" => CandidateState::InReview,
            "evaluated" => CandidateState::Evaluated,
            "interview" => CandidateState::Interview,
            "finalist" => CandidateState::Finalist,
            "selected" => CandidateState::Selected,
            "rejected" => CandidateState::Rejected,
            "discarded" => CandidateState::Discarded,
            other => return Err(format!("unknown candidate state '{other}'")),
        };
        Ok(state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub tracking_code: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Already-extracted résumé text. `None` until extraction has happened upstream.
    pub resume_text: Option<String>,
    pub state: CandidateState,
    pub process_id: Option<Uuid>,
}

impl CandidateRecord {
    /// Résumé text if present and not blank.
    pub fn resume(&self) -> Option<&str> {
        self.resume_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Payload accepted when an applicant submits to a process.
#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub process_id: Option<Uuid>,
}

impl NewApplication {
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name cannot be empty".to_string());
        }
        if !self.email.contains('@') {
            return Err(format!("'{}' is not a valid email address", self.email));
        }
        Ok(())
    }

    pub fn into_record(self) -> CandidateRecord {
        let id = Uuid::new_v4();
        CandidateRecord {
            id,
            tracking_code: tracking_code_for(id),
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_ascii_lowercase(),
            phone: self.phone,
            submitted_at: Utc::now(),
            resume_text: self.resume_text,
            state: CandidateState::New,
            process_id: self.process_id,
        }
    }
}

/// Applicant-facing code derived from the record id, e.g. `CAND-1A2B3C4D`.
pub fn tracking_code_for(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("CAND-{}", simple[..8].to_ascii_uppercase())
}

/// Reference accepted on every candidate route: a UUID or a tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateRef {
    Id(Uuid),
    TrackingCode(String),
}

impl CandidateRef {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => CandidateRef::Id(id),
            Err(_) => CandidateRef::TrackingCode(raw.trim().to_ascii_uppercase()),
        }
    }
}

impl fmt::Display for CandidateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateRef::Id(id) => write!(f, "{id}"),
            CandidateRef::TrackingCode(code) => f.write_str(code),
        }
    }
}
