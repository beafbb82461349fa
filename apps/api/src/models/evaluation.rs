use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvaluationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `None` for rows written before sessions were tracked.
    pub session_id: Option<String>,
    pub candidate_id: Option<Uuid>,
    pub jd_id: Option<Uuid>,
    pub rubric_id: String,
    pub rubric_title: String,
    pub rubric_weightages: Option<Value>,
    pub overall_score: f64,
    pub scores: Value,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
