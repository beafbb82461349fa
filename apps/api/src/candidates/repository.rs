use sqlx::PgPool;
use uuid::Uuid;

use crate::models::candidate::CandidateRow;

#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: String,
    pub current_company: String,
    pub location: String,
    pub experience: String,
    pub group_name: String,
    pub file_name: String,
    pub file_type: String,
    pub resume_content: String,
    pub storage_key: Option<String>,
}

/// Partial update; `None` leaves the column unchanged. For the nullable
/// contact columns `Some(None)` clears the value.
#[derive(Debug, Default)]
pub struct CandidateChanges {
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub group_name: Option<String>,
}

pub async fn list(pool: &PgPool, user_id: Uuid) -> Result<Vec<CandidateRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM candidates WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM candidates WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// The user's candidates among `ids`; unknown or foreign ids are skipped.
pub async fn find_many(
    pool: &PgPool,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<CandidateRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM candidates WHERE user_id = $1 AND id = ANY($2) ORDER BY created_at")
        .bind(user_id)
        .bind(ids)
        .fetch_all(pool)
        .await
}

/// Raw and parsed content both hold the recovered resume text.
pub async fn insert(pool: &PgPool, c: NewCandidate) -> Result<CandidateRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO candidates
            (id, user_id, name, email, phone, role_title, company_name, location, experience,
             group_name, file_name, file_type, raw_content, parsed_content, storage_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, $14)
        RETURNING *
        "#,
    )
    .bind(c.id)
    .bind(c.user_id)
    .bind(c.name)
    .bind(c.email)
    .bind(c.phone)
    .bind(c.current_role)
    .bind(c.current_company)
    .bind(c.location)
    .bind(c.experience)
    .bind(c.group_name)
    .bind(c.file_name)
    .bind(c.file_type)
    .bind(c.resume_content)
    .bind(c.storage_key)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: CandidateChanges,
) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE candidates SET
            name         = COALESCE($3, name),
            email        = CASE WHEN $4 THEN $5 ELSE email END,
            phone        = CASE WHEN $6 THEN $7 ELSE phone END,
            role_title   = COALESCE($8, role_title),
            company_name = COALESCE($9, company_name),
            location     = COALESCE($10, location),
            experience   = COALESCE($11, experience),
            group_name   = COALESCE($12, group_name),
            updated_at   = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.name)
    .bind(changes.email.is_some())
    .bind(changes.email.flatten())
    .bind(changes.phone.is_some())
    .bind(changes.phone.flatten())
    .bind(changes.current_role)
    .bind(changes.current_company)
    .bind(changes.location)
    .bind(changes.experience)
    .bind(changes.group_name)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<CandidateRow>, sqlx::Error> {
    sqlx::query_as("DELETE FROM candidates WHERE id = $1 AND user_id = $2 RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
