use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::agent_client::{unix_millis, ChatMessage};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::rubrics::parser::{extract_rubrics, RubricError};
use crate::state::AppState;

const UPSTREAM_FAILURE: &str = "Failed to generate rubrics from Lyzr API";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRubricsRequest {
    #[serde(default)]
    pub job_description_content: String,
    pub job_description_id: Option<String>,
    /// Skip the cache and ask the agent again.
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateRubricsResponse {
    pub rubrics: Value,
}

/// Chat session id for a rubric request: `{jd id or "adhoc"}-{unix millis}`.
pub fn rubric_session_id(job_description_id: Option<&str>) -> String {
    let prefix = job_description_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or("adhoc");
    format!("{}-{}", prefix, unix_millis())
}

/// POST /api/generate-rubrics
pub async fn handle_generate_rubrics(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateRubricsRequest>,
) -> Result<Json<GenerateRubricsResponse>, AppError> {
    let content = req.job_description_content.as_str();
    if content.trim().is_empty() {
        return Err(AppError::validation("Job description content is required"));
    }

    if !req.regenerate {
        if let Some(rubrics) = state.rubric_cache.get(user.id, content).await {
            info!("Serving cached rubrics for user {}", user.id);
            return Ok(Json(GenerateRubricsResponse { rubrics }));
        }
    }

    let session_id = rubric_session_id(req.job_description_id.as_deref());
    let body = state
        .agent
        .chat(
            &user.token,
            ChatMessage {
                user_id: &user.email,
                agent_id: &state.config.agents.rubrics_agent_id,
                session_id: &session_id,
                message: content,
                assets: None,
            },
        )
        .await
        .map_err(|e| {
            error!("Rubrics agent call failed: {e}");
            AppError::Agent {
                status: e.status().unwrap_or(502),
                message: UPSTREAM_FAILURE.to_string(),
            }
        })?;

    let rubrics = extract_rubrics(&body).map_err(|e| {
        error!("Unusable rubrics reply: {body}");
        match e {
            RubricError::InvalidFormat => AppError::AgentFormat {
                message: e.to_string(),
                raw: Some(body.clone()),
            },
            RubricError::MissingFields => AppError::AgentFormat {
                message: e.to_string(),
                raw: None,
            },
        }
    })?;

    let rubrics = Value::Array(rubrics);
    state.rubric_cache.put(user.id, content, &rubrics).await;

    info!("Generated rubrics for session {session_id}");
    Ok(Json(GenerateRubricsResponse { rubrics }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_session_id_uses_jd_id() {
        let id = rubric_session_id(Some("jd-1"));
        let (prefix, millis) = id.rsplit_once('-').unwrap();
        assert_eq!(prefix, "jd-1");
        assert!(millis.parse::<u128>().is_ok());
    }

    #[test]
    fn test_rubric_session_id_without_jd() {
        assert!(rubric_session_id(None).starts_with("adhoc-"));
        assert!(rubric_session_id(Some(" ")).starts_with("adhoc-"));
    }

    #[test]
    fn test_request_defaults() {
        let req: GenerateRubricsRequest =
            serde_json::from_str(r#"{"jobDescriptionContent": "Rust engineer"}"#).unwrap();
        assert!(!req.regenerate);
        assert_eq!(req.job_description_id, None);
    }
}
