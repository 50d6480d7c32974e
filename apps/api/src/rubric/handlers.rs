use axum::{extract::State, Json};

use crate::access::{CallerRole, ADMIN_ONLY, STAFF};
use crate::errors::AppError;
use crate::rubric::defaults;
use crate::rubric::models::{ActiveConfig, ScoringConfig};
use crate::state::AppState;

/// GET /api/v1/config
pub async fn handle_get_config(
    State(state): State<AppState>,
    caller: CallerRole,
) -> Result<Json<ActiveConfig>, AppError> {
    caller.require(STAFF)?;
    Ok(Json(state.rubric.get_active().await?))
}

/// POST /api/v1/config
/// Activates a new configuration. Existing evaluations become stale; none are recomputed.
pub async fn handle_set_config(
    State(state): State<AppState>,
    caller: CallerRole,
    Json(config): Json<ScoringConfig>,
) -> Result<Json<ActiveConfig>, AppError> {
    caller.require(ADMIN_ONLY)?;
    Ok(Json(state.rubric.set_active(config).await?))
}

/// GET /api/v1/config/default
pub async fn handle_default_config(caller: CallerRole) -> Result<Json<ScoringConfig>, AppError> {
    caller.require(STAFF)?;
    Ok(Json(defaults::scoring_config()))
}
