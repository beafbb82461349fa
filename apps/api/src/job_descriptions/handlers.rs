use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::documents::parse_file;
use crate::errors::AppError;
use crate::job_descriptions::repository::{self, JobDescriptionChanges, NewJobDescription};
use crate::models::job_description::JobDescriptionRow;
use crate::routes::extract::{attachment, multipart_error, IdQuery};
use crate::state::AppState;
use crate::storage::{content_type_for, upload_key, UploadKind};

const NOT_FOUND: &str = "Job description not found";
const NOT_SPECIFIED: &str = "Not specified";
const DEFAULT_JOB_TYPE: &str = "Full-time";

#[derive(Default)]
struct JobDescriptionForm {
    file: Option<(String, Bytes)>,
    title: Option<String>,
    department: Option<String>,
    location: Option<String>,
    job_type: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<JobDescriptionForm, AppError> {
    let mut form = JobDescriptionForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((file_name, bytes));
            }
            "title" | "department" | "location" | "type" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "title" => form.title = value,
                    "department" => form.department = value,
                    "location" => form.location = value,
                    _ => form.job_type = value,
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// GET /api/job-descriptions
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<JobDescriptionRow>>, AppError> {
    Ok(Json(repository::list(&state.db, user.id).await?))
}

/// POST /api/job-descriptions
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobDescriptionRow>), AppError> {
    let form = read_form(multipart).await?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| AppError::validation("No file provided"))?;

    let parsed = parse_file(&file_name, bytes.clone())
        .await
        .map_err(|e| AppError::validation(e.to_string()))?;

    let raw_content = if parsed.file_type == "txt" {
        // Postgres text columns reject NUL.
        String::from_utf8_lossy(&bytes).replace('\0', "")
    } else {
        parsed.text.clone()
    };

    let id = Uuid::new_v4();
    let key = upload_key(user.id, UploadKind::JobDescription, id, &file_name);
    let storage_key = match state
        .storage
        .put(&key, bytes, content_type_for(&file_name))
        .await
    {
        Ok(()) => Some(key),
        Err(e) => {
            warn!("Could not archive job description {file_name}: {e}");
            None
        }
    };

    let row = repository::insert(
        &state.db,
        NewJobDescription {
            id,
            user_id: user.id,
            title: form.title.unwrap_or_else(|| file_name.clone()),
            department: form.department.unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            location: form.location.unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            job_type: form.job_type.unwrap_or_else(|| DEFAULT_JOB_TYPE.to_string()),
            file_name,
            file_type: parsed.file_type,
            raw_content,
            parsed_content: parsed.text,
            storage_key,
        },
    )
    .await?;

    info!("Created job description {} for user {}", row.id, user.id);
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobDescriptionRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub content: Option<String>,
}

/// PUT /api/job-descriptions?id=
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<IdQuery>,
    Json(req): Json<UpdateJobDescriptionRequest>,
) -> Result<Json<JobDescriptionRow>, AppError> {
    let id = query.record_id(NOT_FOUND)?;
    let changes = JobDescriptionChanges {
        title: req.title,
        department: req.department,
        location: req.location,
        job_type: req.job_type,
        content: req.content,
    };
    let row = repository::update(&state.db, user.id, id, changes)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(row))
}

/// DELETE /api/job-descriptions?id=
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
            warn!("Could not remove archived file {key}: {e}");
        }
    }

    info!("Deleted job description {id} for user {}", user.id);
    Ok(Json(json!({ "success": true })))
}

/// GET /api/job-descriptions/:id/file
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
        .ok_or_else(|| AppError::not_found("No file stored for this job description"))?;
    let bytes = state
        .storage
        .get(&key)
        .await?
        .ok_or_else(|| AppError::not_found("No file stored for this job description"))?;
    Ok(attachment(&row.file_name, bytes))
}
