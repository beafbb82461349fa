use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::evaluation::CandidateEvaluationRow;

pub struct NewEvaluation {
    pub user_id: Uuid,
    pub session_id: String,
    pub candidate_id: Uuid,
    pub jd_id: Uuid,
    pub rubric_id: String,
    pub rubric_title: String,
    pub rubric_weightages: Value,
    pub overall_score: f64,
    pub scores: Value,
    pub summary: String,
}

pub async fn insert(pool: &PgPool, e: NewEvaluation) -> Result<CandidateEvaluationRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO candidate_evaluations
            (id, user_id, session_id, candidate_id, jd_id, rubric_id, rubric_title,
             rubric_weightages, overall_score, scores, summary)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(e.user_id)
    .bind(e.session_id)
    .bind(e.candidate_id)
    .bind(e.jd_id)
    .bind(e.rubric_id)
    .bind(e.rubric_title)
    .bind(e.rubric_weightages)
    .bind(e.overall_score)
    .bind(e.scores)
    .bind(e.summary)
    .fetch_one(pool)
    .await
}
