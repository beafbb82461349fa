use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// An evaluation joined with its JD and candidate. The joined columns are
/// `None` once the JD or candidate has been deleted.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEvaluationRow {
    pub id: Uuid,
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
    pub jd_title: Option<String>,
    pub jd_department: Option<String>,
    pub jd_location: Option<String>,
    pub jd_content: Option<String>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub candidate_phone: Option<String>,
    pub candidate_role: Option<String>,
    pub candidate_company: Option<String>,
    pub candidate_location: Option<String>,
    pub candidate_experience: Option<String>,
}

const SELECT_JOINED: &str = r#"
    SELECT e.id, e.session_id, e.candidate_id, e.jd_id, e.rubric_id, e.rubric_title,
           e.rubric_weightages, e.overall_score, e.scores, e.summary, e.created_at,
           jd.title          AS jd_title,
           jd.department     AS jd_department,
           jd.location       AS jd_location,
           jd.parsed_content AS jd_content,
           c.name            AS candidate_name,
           c.email           AS candidate_email,
           c.phone           AS candidate_phone,
           c.role_title      AS candidate_role,
           c.company_name    AS candidate_company,
           c.location        AS candidate_location,
           c.experience      AS candidate_experience
    FROM candidate_evaluations e
    LEFT JOIN job_descriptions jd ON jd.id = e.jd_id
    LEFT JOIN candidates c ON c.id = e.candidate_id
"#;

/// All of the user's evaluations, newest first.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<SessionEvaluationRow>, sqlx::Error> {
    let sql = format!("{SELECT_JOINED} WHERE e.user_id = $1 ORDER BY e.created_at DESC");
    sqlx::query_as(&sql).bind(user_id).fetch_all(pool).await
}

pub async fn by_session_id(
    pool: &PgPool,
    user_id: Uuid,
    session_id: &str,
) -> Result<Vec<SessionEvaluationRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_JOINED} WHERE e.user_id = $1 AND e.session_id = $2 ORDER BY e.created_at DESC"
    );
    sqlx::query_as(&sql)
        .bind(user_id)
        .bind(session_id)
        .fetch_all(pool)
        .await
}

/// Rows written before sessions were tracked, matched on JD and rubric.
pub async fn by_jd_and_rubric(
    pool: &PgPool,
    user_id: Uuid,
    jd_id: Uuid,
    rubric_id: &str,
) -> Result<Vec<SessionEvaluationRow>, sqlx::Error> {
    let sql = format!(
        "{SELECT_JOINED} WHERE e.user_id = $1 AND e.jd_id = $2 AND e.rubric_id = $3 \
         ORDER BY e.created_at DESC"
    );
    sqlx::query_as(&sql)
        .bind(user_id)
        .bind(jd_id)
        .bind(rubric_id)
        .fetch_all(pool)
        .await
}
