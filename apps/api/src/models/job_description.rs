use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    /// Employment type ("Full-time", "Contract", ...).
    #[serde(rename = "type")]
    pub job_type: String,
    pub file_name: String,
    pub file_type: String,
    /// Original text as uploaded (untrimmed for plain-text files).
    pub raw_content: String,
    /// Sanitized text used for matching and prompts.
    pub parsed_content: String,
    pub status: String,
    #[serde(skip_serializing)]
    pub storage_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
