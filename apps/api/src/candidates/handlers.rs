use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent_client::{agent_session_id, response_text, AgentError, ChatMessage};
use crate::auth::AuthUser;
use crate::candidates::extraction::{recover_profile, ResumeUpload};
use crate::candidates::repository::{self, CandidateChanges};
use crate::errors::AppError;
use crate::models::candidate::CandidateRow;
use crate::routes::extract::{attachment, multipart_error, IdQuery};
use crate::state::AppState;
use crate::storage::{content_type_for, upload_key, UploadKind};

const NOT_FOUND: &str = "Candidate not found";
const DEFAULT_GROUP: &str = "Not Specified";
const EXTRACTION_PROMPT: &str = "Extract candidate information from this resume.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedFile {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadCandidatesResponse {
    pub uploaded: usize,
    pub failed: usize,
    pub candidates: Vec<CandidateRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FailedFile>>,
}

impl UploadCandidatesResponse {
    pub fn new(candidates: Vec<CandidateRow>, failures: Vec<FailedFile>) -> Self {
        Self {
            uploaded: candidates.len(),
            failed: failures.len(),
            candidates,
            errors: if failures.is_empty() {
                None
            } else {
                Some(failures)
            },
        }
    }
}

/// GET /api/candidates
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CandidateRow>>, AppError> {
    Ok(Json(repository::list(&state.db, user.id).await?))
}

/// POST /api/candidates
///
/// Resumes are processed one at a time; a failing file is reported in
/// `errors` and does not stop the batch.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadCandidatesResponse>), AppError> {
    let mut files: Vec<(String, Bytes)> = Vec::new();
    let mut group_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                files.push((file_name, bytes));
            }
            "groupName" => {
                let value = field.text().await.map_err(multipart_error)?;
                group_name = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(AppError::validation("No files provided"));
    }
    let group_name = group_name.unwrap_or_else(|| DEFAULT_GROUP.to_string());

    let mut candidates = Vec::new();
    let mut failures = Vec::new();

    for (file_name, bytes) in files {
        info!("Processing resume {} ({} bytes)", file_name, bytes.len());
        match process_resume(&state, &user, &file_name, bytes, &group_name).await {
            Ok(candidate) => {
                info!("Stored candidate {} from {}", candidate.id, file_name);
                candidates.push(candidate);
            }
            Err(message) => {
                warn!("Resume {file_name} failed: {message}");
                failures.push(FailedFile {
                    file_name,
                    error: message,
                });
            }
        }
    }

    info!(
        "Resume upload finished: {} stored, {} failed",
        candidates.len(),
        failures.len()
    );
    Ok((
        StatusCode::CREATED,
        Json(UploadCandidatesResponse::new(candidates, failures)),
    ))
}

fn upload_error(e: AgentError) -> String {
    match e {
        AgentError::MissingAssetId => "No asset ID received".to_string(),
        AgentError::Api { status, .. } => format!("Upload failed: {status}"),
        other => other.to_string(),
    }
}

fn parsing_error(e: AgentError) -> String {
    match e {
        AgentError::Api { status, .. } => format!("AI parsing failed: {status}"),
        other => other.to_string(),
    }
}

/// Upload asset, ask the agent, recover the profile, archive and store.
async fn process_resume(
    state: &AppState,
    user: &AuthUser,
    file_name: &str,
    bytes: Bytes,
    group_name: &str,
) -> Result<CandidateRow, String> {
    let asset_id = state
        .agent
        .upload_asset(&user.token, file_name, bytes.clone())
        .await
        .map_err(upload_error)?;

    let agent_id = &state.config.agents.candidates_agent_id;
    let session_id = agent_session_id(agent_id);
    let body = state
        .agent
        .chat(
            &user.token,
            ChatMessage {
                user_id: &user.email,
                agent_id,
                session_id: &session_id,
                message: EXTRACTION_PROMPT,
                assets: Some(vec![asset_id]),
            },
        )
        .await
        .map_err(parsing_error)?;

    let text = response_text(&body);
    let profile = recover_profile(text).ok_or_else(|| {
        let snippet: String = text.chars().take(500).collect();
        error!("Unusable agent reply for {file_name}: {snippet}");
        "Failed to parse AI response".to_string()
    })?;

    let id = Uuid::new_v4();
    let key = upload_key(user.id, UploadKind::Resume, id, file_name);
    let storage_key = match state
        .storage
        .put(&key, bytes, content_type_for(file_name))
        .await
    {
        Ok(()) => Some(key),
        Err(e) => {
            warn!("Could not archive resume {file_name}: {e}");
            None
        }
    };

    let new_candidate = profile.into_new_candidate(ResumeUpload {
        id,
        user_id: user.id,
        file_name,
        group_name,
        storage_key,
    });

    repository::insert(&state.db, new_candidate)
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidateRequest {
    pub name: Option<String>,
    /// Absent leaves the email alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub group_name: Option<String>,
}

/// Marks a field as present, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// PUT /api/candidates?id=
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<IdQuery>,
    Json(req): Json<UpdateCandidateRequest>,
) -> Result<Json<CandidateRow>, AppError> {
    let id = query.record_id(NOT_FOUND)?;
    let changes = CandidateChanges {
        name: req.name,
        email: req.email,
        phone: req.phone,
        current_role: req.current_role,
        current_company: req.current_company,
        location: req.location,
        experience: req.experience,
        group_name: req.group_name,
    };
    let row = repository::update(&state.db, user.id, id, changes)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(row))
}

/// DELETE /api/candidates?id=
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, AppError> {
    let id = query.record_id(NOT_FOUND)?;
    let row = repository::delete(&state.db, user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    if let Some(key) = row.storage_key {
        if let Err(e) = state.storage.delete(&key).await {
            warn!("Could not remove archived resume {key}: {e}");
        }
    }

    info!("Deleted candidate {id} for user {}", user.id);
    Ok(Json(json!({ "success": true })))
}

/// GET /api/candidates/:id/file
pub async fn handle_download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = repository::find(&state.db, user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let key = row
        .storage_key
        .ok_or_else(|| AppError::not_found("No resume file stored for this candidate"))?;
    let bytes = state
        .storage
        .get(&key)
        .await?
        .ok_or_else(|| AppError::not_found("No resume file stored for this candidate"))?;
    Ok(attachment(&row.file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_omitted_when_every_file_succeeds() {
        let response = UploadCandidatesResponse::new(Vec::new(), Vec::new());
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["uploaded"], 0);
        assert!(body.get("errors").is_none());
    }

    fn api_error(status: u16) -> AgentError {
        AgentError::Api {
            status,
            body: "upstream said no".to_string(),
        }
    }

    #[test]
    fn test_per_file_error_texts() {
        assert_eq!(upload_error(api_error(413)), "Upload failed: 413");
        assert_eq!(upload_error(AgentError::MissingAssetId), "No asset ID received");
        assert_eq!(parsing_error(api_error(500)), "AI parsing failed: 500");
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let req: UpdateCandidateRequest =
            serde_json::from_str(r#"{"email": null, "currentRole": "Lead"}"#).unwrap();
        assert_eq!(req.email, Some(None));
        assert_eq!(req.phone, None);
        assert_eq!(req.current_role.as_deref(), Some("Lead"));

        let req: UpdateCandidateRequest =
            serde_json::from_str(r#"{"phone": "+44 20 7946 0000"}"#).unwrap();
        assert_eq!(req.phone, Some(Some("+44 20 7946 0000".to_string())));
        assert_eq!(req.email, None);
    }

    #[test]
    fn test_failures_are_reported_in_camel_case() {
        let response = UploadCandidatesResponse::new(
            Vec::new(),
            vec![FailedFile {
                file_name: "cv.pdf".to_string(),
                error: "Upload failed: 500".to_string(),
            }],
        );
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["failed"], 1);
        assert_eq!(body["errors"][0]["fileName"], "cv.pdf");
        assert_eq!(body["errors"][0]["error"], "Upload failed: 500");
    }
}
