use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[sqlx(rename = "role_title")]
    pub current_role: String,
    #[sqlx(rename = "company_name")]
    pub current_company: String,
    pub location: String,
    pub experience: String,
    pub group_name: String,
    pub file_name: String,
    pub file_type: String,
    pub raw_content: String,
    pub parsed_content: String,
    #[serde(skip_serializing)]
    pub storage_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
