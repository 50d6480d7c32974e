use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    Published,
    InReview,
    Interviewing,
    Finalized,
    Cancelled,
}

impl ProcessState {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcessState::Published => "published",
            ProcessState::InReview => "in-review",
            ProcessState::Interviewing => "interviewing",
            ProcessState::Finalized => "finalized",
            ProcessState::Cancelled => "cancelled",
        }
    }

    /// Open processes; finalized and cancelled ones take no new applications.
    pub const fn accepts_applications(self) -> bool {
        !matches!(self, ProcessState::Finalized | ProcessState::Cancelled)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessState {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let state = match raw {
            "published" => ProcessState::Published,
            "in-review" => ProcessState::InReview,
            "interviewing" => ProcessState::Interviewing,
            "finalized" => ProcessState::Finalized,
            "cancelled" => ProcessState::Cancelled,
            other => return Err(format!("unknown process state '{other}'")),
        };
        Ok(state)
    }
}

/// A role opening grouping candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: Uuid,
    pub code: String,
    pub role_title: String,
    pub vacancies: i32,
    pub state: ProcessState,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProcess {
    pub code: String,
    pub role_title: String,
    #[serde(default = "default_vacancies")]
    pub vacancies: i32,
}

fn default_vacancies() -> i32 {
    1
}

impl NewProcess {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code cannot be empty".to_string());
        }
        if self.role_title.trim().is_empty() {
            return Err("role_title cannot be empty".to_string());
        }
        if self.vacancies < 1 {
            return Err("vacancies must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn into_record(self) -> ProcessRecord {
        ProcessRecord {
            id: Uuid::new_v4(),
            code: self.code.trim().to_string(),
            role_title: self.role_title.trim().to_string(),
            vacancies: self.vacancies,
            state: ProcessState::Published,
            created_at: Utc::now(),
        }
    }
}

/// Process plus counts derived on read from the candidate and evaluation stores.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    #[serde(flatten)]
    pub process: ProcessRecord,
    pub applications: usize,
    pub evaluated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_process_starts_published() {
        let process = NewProcess {
            code: "FIN-01".to_string(),
            role_title: "Analista Senior de Finanzas".to_string(),
            vacancies: 2,
        }
        .into_record();
        assert_eq!(process.state, ProcessState::Published);
        assert_eq!(process.vacancies, 2);
    }

    #[test]
    fn test_zero_vacancies_rejected() {
        let process = NewProcess {
            code: "FIN-01".to_string(),
            role_title: "Analista".to_string(),
            vacancies: 0,
        };
        assert!(process.validate().is_err());
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!(
            "in-review".parse::<ProcessState>().unwrap(),
            ProcessState::InReview
        );
        assert!("archived".parse::<ProcessState>().is_err());
    }

    #[test]
    fn test_closed_processes_refuse_applications() {
        assert!(ProcessState::Interviewing.accepts_applications());
        assert!(!ProcessState::Finalized.accepts_applications());
        assert!(!ProcessState::Cancelled.accepts_applications());
    }
}
