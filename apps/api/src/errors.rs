use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::candidate::CandidateState;

/// Failure of the record store or the configuration provider.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record already exists: {0}")]
    Conflict(String),

    #[error("stored value is invalid: {0}")]
    Corrupt(String),
}

/// Errors raised while evaluating one candidate or starting a batch.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("candidate {candidate} has no résumé text; extract or upload the CV before evaluating")]
    MissingInput { candidate: String },

    #[error("scoring configuration is unusable: {0}")]
    Configuration(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("candidate {candidate} is {state} and has no evaluation to return")]
    Ineligible {
        candidate: String,
        state: CandidateState,
    },

    #[error("batch evaluation needs at least one candidate")]
    EmptyBatch,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Serializable discriminant of [`EvaluationError`] used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingInput,
    Configuration,
    NotFound,
    Ineligible,
    EmptyBatch,
    Storage,
}

impl EvaluationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluationError::MissingInput { .. } => ErrorKind::MissingInput,
            EvaluationError::Configuration(_) => ErrorKind::Configuration,
            EvaluationError::NotFound(_) => ErrorKind::NotFound,
            EvaluationError::Ineligible { .. } => ErrorKind::Ineligible,
            EvaluationError::EmptyBatch => ErrorKind::EmptyBatch,
            EvaluationError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn storage_failure(err: &StoreError) -> (StatusCode, &'static str, String) {
    tracing::error!("Storage error: {err}");
    match err {
        StoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "STORAGE_ERROR",
            "A storage error occurred".to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Evaluation(err) => match err {
                EvaluationError::MissingInput { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "MISSING_INPUT",
                    err.to_string(),
                ),
                EvaluationError::Configuration(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "CONFIGURATION_ERROR",
                    err.to_string(),
                ),
                EvaluationError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                EvaluationError::Ineligible { .. } => {
                    (StatusCode::CONFLICT, "INELIGIBLE", err.to_string())
                }
                EvaluationError::EmptyBatch => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    err.to_string(),
                ),
                EvaluationError::Storage(inner) => storage_failure(inner),
            },
            AppError::Storage(err) => storage_failure(err),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
