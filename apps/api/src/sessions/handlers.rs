use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::sessions::repository;
use crate::sessions::summary::{build_detail, group_sessions, parse_legacy_key, SessionDetail, SessionSummary};
use crate::state::AppState;

/// GET /api/sessions
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let rows = repository::list_for_user(&state.db, user.id).await?;
    Ok(Json(group_sessions(&rows)))
}

/// GET /api/sessions/:session_id
pub async fn handle_get_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, AppError> {
    let mut rows = repository::by_session_id(&state.db, user.id, &session_id).await?;

    if rows.is_empty() {
        if let Some((jd_id, rubric_id)) = parse_legacy_key(&session_id) {
            rows = repository::by_jd_and_rubric(&state.db, user.id, jd_id, &rubric_id).await?;
        }
    }

    Ok(Json(build_detail(&rows)?))
}
