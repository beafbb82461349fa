pub mod extract;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::evaluation::handlers as evaluation;
use crate::job_descriptions::handlers as job_descriptions;
use crate::rubrics::handlers as rubrics;
use crate::sessions::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // JD library
        .route(
            "/api/job-descriptions",
            get(job_descriptions::handle_list)
                .post(job_descriptions::handle_create)
                .put(job_descriptions::handle_update)
                .delete(job_descriptions::handle_delete)
                .layer(upload_limit.clone()),
        )
        .route(
            "/api/job-descriptions/:id/file",
            get(job_descriptions::handle_download),
        )
        // Candidate database
        .route(
            "/api/candidates",
            get(candidates::handle_list)
                .post(candidates::handle_upload)
                .put(candidates::handle_update)
                .delete(candidates::handle_delete)
                .layer(upload_limit),
        )
        .route("/api/candidates/:id/file", get(candidates::handle_download))
        // Rubrics and evaluation
        .route(
            "/api/generate-rubrics",
            post(rubrics::handle_generate_rubrics),
        )
        .route(
            "/api/evaluate-candidates",
            post(evaluation::handle_evaluate_candidates),
        )
        // Sessions
        .route("/api/sessions", get(sessions::handle_list_sessions))
        .route("/api/sessions/:session_id", get(sessions::handle_get_session))
        .with_state(state)
}
