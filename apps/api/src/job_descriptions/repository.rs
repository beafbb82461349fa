use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job_description::JobDescriptionRow;

pub struct NewJobDescription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    pub job_type: String,
    pub file_name: String,
    pub file_type: String,
    pub raw_content: String,
    pub parsed_content: String,
    pub storage_key: Option<String>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Default)]
pub struct JobDescriptionChanges {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub content: Option<String>,
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM job_descriptions WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn find(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM job_descriptions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, jd: NewJobDescription) -> Result<JobDescriptionRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO job_descriptions
            (id, user_id, title, department, location, job_type, file_name, file_type,
             raw_content, parsed_content, status, storage_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active', $11)
        RETURNING *
        "#,
    )
    .bind(jd.id)
    .bind(jd.user_id)
    .bind(jd.title)
    .bind(jd.department)
    .bind(jd.location)
    .bind(jd.job_type)
    .bind(jd.file_name)
    .bind(jd.file_type)
    .bind(jd.raw_content)
    .bind(jd.parsed_content)
    .bind(jd.storage_key)
    .fetch_one(pool)
    .await
}

/// `content` replaces both the raw and the parsed text.
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: JobDescriptionChanges,
) -> Result<Option<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE job_descriptions SET
            title          = COALESCE($3, title),
            department     = COALESCE($4, department),
            location       = COALESCE($5, location),
            job_type       = COALESCE($6, job_type),
            raw_content    = COALESCE($7, raw_content),
            parsed_content = COALESCE($7, parsed_content),
            updated_at     = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.title)
    .bind(changes.department)
    .bind(changes.location)
    .bind(changes.job_type)
    .bind(changes.content)
    .fetch_optional(pool)
    .await
}

/// Deletes and returns the row so its archived file can be removed.
pub async fn delete(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<JobDescriptionRow>, sqlx::Error> {
    sqlx::query_as("DELETE FROM job_descriptions WHERE id = $1 AND user_id = $2 RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
