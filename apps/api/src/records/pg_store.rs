use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::candidate::{CandidateRecord, CandidateState};
use crate::models::comment::Comment;
use crate::models::process::{ProcessRecord, ProcessState};
use crate::records::store::RecordStore;

// States are stored as their text form; rows are converted on the way out.

#[derive(FromRow)]
struct CandidateRow {
    id: Uuid,
    tracking_code: String,
    full_name: String,
    email: String,
    phone: Option<String>,
    submitted_at: DateTime<Utc>,
    resume_text: Option<String>,
    state: String,
    process_id: Option<Uuid>,
}

impl TryFrom<CandidateRow> for CandidateRecord {
    type Error = StoreError;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        Ok(CandidateRecord {
            id: row.id,
            tracking_code: row.tracking_code,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            submitted_at: row.submitted_at,
            resume_text: row.resume_text,
            state: row.state.parse().map_err(StoreError::Corrupt)?,
            process_id: row.process_id,
        })
    }
}

#[derive(FromRow)]
struct ProcessRow {
    id: Uuid,
    code: String,
    role_title: String,
    vacancies: i32,
    state: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProcessRow> for ProcessRecord {
    type Error = StoreError;

    fn try_from(row: ProcessRow) -> Result<Self, Self::Error> {
        Ok(ProcessRecord {
            id: row.id,
            code: row.code,
            role_title: row.role_title,
            vacancies: row.vacancies,
            state: row.state.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

fn conflict_or(err: sqlx::Error, what: String) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(err),
    }
}

const CANDIDATE_COLUMNS: &str = "id, tracking_code, full_name, email, phone, submitted_at, resume_text, state, process_id";
const PROCESS_COLUMNS: &str = "id, code, role_title, vacancies, state, created_at";

pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_candidate(&self, record: CandidateRecord) -> Result<CandidateRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, tracking_code, full_name, email, phone, submitted_at, resume_text, state, process_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.tracking_code)
        .bind(&record.full_name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.submitted_at)
        .bind(&record.resume_text)
        .bind(record.state.as_str())
        .bind(record.process_id)
        .execute(&self.db)
        .await
        .map_err(|e| conflict_or(e, format!("candidate {}", record.tracking_code)))?;

        Ok(record)
    }

    async fn candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, StoreError> {
        let row: Option<CandidateRow> =
            sqlx::query_as(&format!("SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn candidate_by_code(&self, code: &str) -> Result<Option<CandidateRecord>, StoreError> {
        let row: Option<CandidateRow> = sqlx::query_as(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE upper(tracking_code) = upper($1)"
        ))
        .bind(code)
        .fetch_optional(&self.db)
        .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn candidates(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let rows: Vec<CandidateRow> = sqlx::query_as(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates ORDER BY submitted_at, id"
        ))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(CandidateRecord::try_from).collect()
    }

    async fn candidates_for_process(
        &self,
        process_id: Uuid,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        let rows: Vec<CandidateRow> = sqlx::query_as(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE process_id = $1 ORDER BY submitted_at, id"
        ))
        .bind(process_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(CandidateRecord::try_from).collect()
    }

    async fn set_candidate_state(
        &self,
        id: Uuid,
        state: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let row: Option<CandidateRow> = sqlx::query_as(&format!(
            "UPDATE candidates SET state = $2 WHERE id = $1 RETURNING {CANDIDATE_COLUMNS}"
        ))
        .bind(id)
        .bind(state.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn advance_candidate_state(
        &self,
        id: Uuid,
        expected: &[CandidateState],
        next: CandidateState,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        let row: Option<CandidateRow> = sqlx::query_as(&format!(
            "UPDATE candidates SET state = $2 WHERE id = $1 AND state = ANY($3) RETURNING {CANDIDATE_COLUMNS}"
        ))
        .bind(id)
        .bind(next.as_str())
        .bind(expected)
        .fetch_optional(&self.db)
        .await?;
        row.map(CandidateRecord::try_from).transpose()
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM comments WHERE candidate_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }

    async fn append_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        sqlx::query(
            "INSERT INTO comments (id, candidate_id, author, text, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(comment.candidate_id)
        .bind(&comment.author)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.db)
        .await?;
        Ok(comment)
    }

    async fn comments(&self, candidate_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query_as::<_, Comment>(
            "SELECT id, candidate_id, author, text, created_at FROM comments WHERE candidate_id = $1 ORDER BY created_at, id",
        )
        .bind(candidate_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert_process(&self, process: ProcessRecord) -> Result<ProcessRecord, StoreError> {
        sqlx::query(
            "INSERT INTO processes (id, code, role_title, vacancies, state, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(process.id)
        .bind(&process.code)
        .bind(&process.role_title)
        .bind(process.vacancies)
        .bind(process.state.as_str())
        .bind(process.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| conflict_or(e, format!("process code {}", process.code)))?;
        Ok(process)
    }

    async fn process(&self, id: Uuid) -> Result<Option<ProcessRecord>, StoreError> {
        let row: Option<ProcessRow> =
            sqlx::query_as(&format!("SELECT {PROCESS_COLUMNS} FROM processes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        row.map(ProcessRecord::try_from).transpose()
    }

    async fn processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        let rows: Vec<ProcessRow> =
            sqlx::query_as(&format!("SELECT {PROCESS_COLUMNS} FROM processes ORDER BY created_at, id"))
                .fetch_all(&self.db)
                .await?;
        rows.into_iter().map(ProcessRecord::try_from).collect()
    }

    async fn set_process_state(
        &self,
        id: Uuid,
        state: ProcessState,
    ) -> Result<Option<ProcessRecord>, StoreError> {
        let row: Option<ProcessRow> = sqlx::query_as(&format!(
            "UPDATE processes SET state = $2 WHERE id = $1 RETURNING {PROCESS_COLUMNS}"
        ))
        .bind(id)
        .bind(state.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(ProcessRecord::try_from).transpose()
    }
}
