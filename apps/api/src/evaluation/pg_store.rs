use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::evaluation::store::EvaluationStore;
use crate::scoring::models::EvaluationResult;

/// Postgres-backed store. The result is kept whole in a JSONB payload; the
/// version and timestamp columns are duplicated for querying.
pub struct PgEvaluationStore {
    db: PgPool,
}

impl PgEvaluationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EvaluationStore for PgEvaluationStore {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<EvaluationResult>, StoreError> {
        let row: Option<(Json<EvaluationResult>,)> =
            sqlx::query_as("SELECT payload FROM evaluations WHERE candidate_id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|(Json(result),)| result))
    }

    async fn put(&self, result: &EvaluationResult) -> Result<(), StoreError> {
        let mut stored = result.clone();
        stored.cached = false;

        sqlx::query(
            r#"
            INSERT INTO evaluations (candidate_id, config_version, evaluated_at, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (candidate_id) DO UPDATE
            SET config_version = EXCLUDED.config_version,
                evaluated_at   = EXCLUDED.evaluated_at,
                payload        = EXCLUDED.payload
            "#,
        )
        .bind(stored.candidate_id)
        .bind(stored.config_version.0)
        .bind(stored.evaluated_at)
        .bind(Json(&stored))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete_for(&self, candidate_id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM evaluations WHERE candidate_id = $1")
            .bind(candidate_id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_for(
        &self,
        candidate_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, EvaluationResult>, StoreError> {
        let rows: Vec<(Json<EvaluationResult>,)> =
            sqlx::query_as("SELECT payload FROM evaluations WHERE candidate_id = ANY($1)")
                .bind(candidate_ids)
                .fetch_all(&self.db)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(Json(result),)| (result.candidate_id, result))
            .collect())
    }
}
