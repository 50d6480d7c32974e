//! Record Store: candidates with their comments, and the processes owning them.
//!
//! Comments are append-only; the only way one disappears is erasure of its candidate.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::candidate::{CandidateRecord, CandidateRef, CandidateState};
use crate::models::comment::Comment;
use crate::models::process::{ProcessRecord, ProcessState};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_candidate(&self, record: CandidateRecord) -> Result<CandidateRecord, StoreError>;
    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError>;
    async fn candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>, StoreError>;
    /// Every candidate in submission order.
    async fn candidates(&self) -> Result<Vec<CandidateRecord>, StoreError>;
    /// Candidates of one process in submission order.
    async fn candidates_for_process(
        &self,
        process_id: Uuid,
    ) -> Result<Vec<CandidateRecord>, StoreError>;
    async fn set_candidate_state(
        &self,
        id: Uuid,
        state: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError>;
    /// Compare-and-set: moves the candidate to `next` only while its current
    /// state is one of `expected`. `None` when the candidate is missing or
    /// has already moved elsewhere.
    async fn advance_candidate_state(
        &self,
        id: Uuid,
        expected: &[CandidateState],
        next: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError>;
    /// Removes the candidate and its comments. Returns whether it existed.
    async fn delete_candidate(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn append_comment(&self, comment: Comment) -> Result<Comment, StoreError>;
    /// Oldest first.
    async fn comments(&self, candidate_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    async fn insert_process(&self, process: ProcessRecord) -> Result<ProcessRecord, StoreError>;
    async fn process(&self, id: Uuid) -> Result<Option<ProcessRecord>, StoreError>;
    async fn processes(&self) -> Result<Vec<ProcessRecord>, StoreError>;
    async fn set_process_state(
        &self,
        id: Uuid,
        state: ProcessState,
    ) -> Result<Option<ProcessRecord>, StoreError>;

    async fn resolve(&self, reference: &CandidateRef) -> Result<Option<CandidateRecord>, StoreError> {
        match reference {
            CandidateRef::Id(id) => self.candidate(*id).await,
            CandidateRef::TrackingCode(code) => self.candidate_by_code(code).await,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Records {
    candidates: Vec<CandidateRecord>,
    comments: Vec<Comment>,
    processes: Vec<ProcessRecord>,
}

/// Used when no database is configured, and by tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Records>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_candidate(&self, record: CandidateRecord) -> Result<CandidateRecord, StoreError> {
        let mut records = self.records.write().await;
        if records
            .candidates
            .iter()
            .any(|c| c.id == record.id || c.tracking_code == record.tracking_code)
        {
            return Err(StoreError::Conflict(format!(
                "candidate {}",
                record.tracking_code
            )));
        }
        records.candidates.push(record.clone());
        Ok(record)
    }

    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .candidates
            .iter()
            .find(|c| c.tracking_code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        Ok(self.records.read().await.candidates.clone())
    }

    async fn candidates_for_process(
        &self,
        process_id: Uuid,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .candidates
            .iter()
            .filter(|c| c.process_id == Some(process_id))
            .cloned()
            .collect())
    }

    async fn set_candidate_state(
        &self,
        id: Uuid,
        state: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .candidates
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| {
                c.state = state;
                c.clone()
            }))
    }

    async fn advance_candidate_state(
        &self,
        id: Uuid,
        expected: &[CandidateState],
        next: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .candidates
            .iter_mut()
            .find(|c| c.id == id && expected.contains(&c.state))
            .map(|c| {
                c.state = next;
                c.clone()
            }))
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.candidates.len();
        records.candidates.retain(|c| c.id != id);
        let existed = records.candidates.len() != before;
        if existed {
            records.comments.retain(|c| c.candidate_id != id);
        }
        Ok(existed)
    }

    async fn append_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        self.records.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments(&self, candidate_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .comments
            .iter()
            .filter(|c| c.candidate_id == candidate_id)
            .cloned()
            .collect())
    }

    async fn insert_process(&self, process: ProcessRecord) -> Result<ProcessRecord, StoreError> {
        let mut records = self.records.write().await;
        if records
            .processes
            .iter()
            .any(|p| p.code.eq_ignore_ascii_case(&process.code))
        {
            return Err(StoreError::Conflict(format!("process code {}", process.code)));
        }
        records.processes.push(process.clone());
        Ok(process)
    }

    async fn process(&self, id: Uuid) -> Result<Option<ProcessRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.processes.iter().find(|p| p.id == id).cloned())
    }

    async fn processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        Ok(self.records.read().await.processes.clone())
    }

    async fn set_process_state(
        &self,
        id: Uuid,
        state: ProcessState,
    ) -> Result<Option<ProcessRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records
            .processes
            .iter_mut()
            .find(|p| p.id == id)
            .map(|p| {
                p.state = state;
                p.clone()
            }))
    }
}
