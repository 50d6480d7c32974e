pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::access;
use crate::evaluation::handlers as evaluation;
use crate::records::handlers as records;
use crate::rubric::handlers as rubric;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/session", get(access::handle_session))
        // Scoring configuration
        .route(
            "/api/v1/config",
            get(rubric::handle_get_config).post(rubric::handle_set_config),
        )
        .route("/api/v1/config/default", get(rubric::handle_default_config))
        // Candidates
        .route(
            "/api/v1/candidates",
            get(records::handle_list_candidates).post(records::handle_submit_application),
        )
        .route("/api/v1/track/:tracking_code", get(records::handle_track_application))
        .route("/api/v1/dashboard/stats", get(records::handle_dashboard_stats))
        .route(
            "/api/v1/candidates/:candidate",
            get(records::handle_get_candidate).delete(records::handle_erase_candidate),
        )
        .route(
            "/api/v1/candidates/:candidate/state",
            patch(records::handle_update_candidate_state),
        )
        .route(
            "/api/v1/candidates/:candidate/comments",
            get(records::handle_list_comments).post(records::handle_add_comment),
        )
        // Processes
        .route(
            "/api/v1/processes",
            get(records::handle_list_processes).post(records::handle_create_process),
        )
        .route("/api/v1/processes/:id", get(records::handle_get_process))
        .route(
            "/api/v1/processes/:id/state",
            patch(records::handle_update_process_state),
        )
        .route(
            "/api/v1/processes/:id/candidates",
            get(records::handle_process_candidates),
        )
        .route(
            "/api/v1/processes/:id/export",
            get(records::handle_export_process),
        )
        .route(
            "/api/v1/processes/:id/evaluate-all",
            post(evaluation::handle_evaluate_process),
        )
        // Evaluations
        .route("/api/v1/evaluations/preview", post(evaluation::handle_preview))
        .route("/api/v1/evaluations/batch", post(evaluation::handle_batch))
        .route(
            "/api/v1/evaluations/:candidate",
            get(evaluation::handle_get_evaluation),
        )
        .route(
            "/api/v1/evaluations/:candidate/evaluate",
            post(evaluation::handle_evaluate),
        )
        .with_state(state)
}
