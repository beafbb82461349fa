//! Grouping of stored evaluations into browsable sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::sessions::repository::SessionEvaluationRow;

const TOP_CANDIDATES: usize = 5;
const UNKNOWN_JD: &str = "Unknown JD";
const UNKNOWN_METRIC: &str = "Unknown Metric";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopCandidate {
    pub name: String,
    pub current_role: Option<String>,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub jd_id: Option<Uuid>,
    pub jd_title: String,
    pub rubric_id: String,
    pub rubric_title: String,
    pub created_at: DateTime<Utc>,
    pub candidate_count: usize,
    pub top_candidates: Vec<TopCandidate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RubricMetric {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCandidate {
    pub candidate_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub current_role: Option<String>,
    pub current_company: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub overall_score: f64,
    pub summary: String,
    pub scores: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub jd_id: Uuid,
    pub jd_title: String,
    pub jd_department: String,
    pub jd_location: String,
    pub jd_content: String,
    pub rubric_id: String,
    pub rubric_title: String,
    pub rubric_metrics: Vec<RubricMetric>,
    pub all_candidates: Vec<SessionCandidate>,
}

/// Grouping key: the session id, or `{jdId}-{rubricId}` for rows written
/// before sessions existed.
pub fn session_key(row: &SessionEvaluationRow) -> String {
    match &row.session_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            let jd = row
                .jd_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!("{}-{}", jd, row.rubric_id)
        }
    }
}

/// Splits a legacy `{jdId}-{rubricId}` key. The JD id is a UUID and
/// contains hyphens itself, so it is read as the leading 36 characters.
pub fn parse_legacy_key(key: &str) -> Option<(Uuid, String)> {
    let jd_part = key.get(..36)?;
    let jd_id = Uuid::parse_str(jd_part).ok()?;
    let rubric_id = key.get(36..)?.strip_prefix('-')?;
    if rubric_id.is_empty() {
        return None;
    }
    Some((jd_id, rubric_id.to_string()))
}

/// Groups rows (newest first) into sessions in first-seen order. Each session
/// takes its JD, rubric and date from its newest row.
pub fn group_sessions(rows: &[SessionEvaluationRow]) -> Vec<SessionSummary> {
    let mut sessions: Vec<SessionSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = session_key(row);
        let position = *index.entry(key.clone()).or_insert_with(|| {
            sessions.push(SessionSummary {
                id: key,
                jd_id: row.jd_id,
                jd_title: row.jd_title.clone().unwrap_or_else(|| UNKNOWN_JD.to_string()),
                rubric_id: row.rubric_id.clone(),
                rubric_title: row.rubric_title.clone(),
                created_at: row.created_at,
                candidate_count: 0,
                top_candidates: Vec::new(),
            });
            sessions.len() - 1
        });

        let session = &mut sessions[position];
        session.candidate_count += 1;
        if let Some(name) = &row.candidate_name {
            session.top_candidates.push(TopCandidate {
                name: name.clone(),
                current_role: row.candidate_role.clone(),
                overall_score: row.overall_score,
            });
        }
    }

    for session in &mut sessions {
        session
            .top_candidates
            .sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
        session.top_candidates.truncate(TOP_CANDIDATES);
    }
    sessions
}

/// Metrics shown for a session: the stored rubric weightages, or for old
/// rows without them, one metric per score entry.
pub fn rubric_metrics(row: &SessionEvaluationRow) -> Vec<RubricMetric> {
    if let Some(Value::Array(weightages)) = &row.rubric_weightages {
        return weightages
            .iter()
            .map(|w| RubricMetric {
                label: non_empty_str(w.get("label"))
                    .unwrap_or(UNKNOWN_METRIC)
                    .to_string(),
                value: number(w.get("weight")).unwrap_or(0.0),
            })
            .collect();
    }

    let Some(scores) = row.scores.as_array() else {
        return Vec::new();
    };
    scores
        .iter()
        .map(|s| {
            let label = non_empty_str(s.get("label"))
                .or_else(|| non_empty_str(s.get("metric")))
                .unwrap_or(UNKNOWN_METRIC);
            let weight = number(s.get("weight")).filter(|w| *w != 0.0);
            let value = weight.unwrap_or_else(|| {
                let score = non_zero_f64(s.get("score_out_of_10"))
                    .or_else(|| non_zero_f64(s.get("score")))
                    .unwrap_or(0.0);
                (score / 10.0 * 100.0).round()
            });
            RubricMetric {
                label: label.to_string(),
                value,
            }
        })
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Numbers, or strings holding one.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_zero_f64(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| *v != 0.0)
}

/// Builds the detail view from a session's rows, newest first.
pub fn build_detail(rows: &[SessionEvaluationRow]) -> Result<SessionDetail, AppError> {
    let first = rows
        .first()
        .ok_or_else(|| AppError::not_found("No evaluations found for this session"))?;

    let jd_not_found = || AppError::not_found("Job description not found");
    let jd_id = first.jd_id.ok_or_else(jd_not_found)?;
    let jd_title = first.jd_title.clone().ok_or_else(jd_not_found)?;

    let mut all_candidates: Vec<SessionCandidate> = rows
        .iter()
        .filter_map(|row| {
            let candidate_id = row.candidate_id?;
            let name = row.candidate_name.clone()?;
            Some(SessionCandidate {
                candidate_id,
                name,
                email: row.candidate_email.clone(),
                phone: row.candidate_phone.clone(),
                current_role: row.candidate_role.clone(),
                current_company: row.candidate_company.clone(),
                location: row.candidate_location.clone(),
                experience: row.candidate_experience.clone(),
                overall_score: row.overall_score,
                summary: row.summary.clone(),
                scores: if row.scores.is_null() {
                    Value::Array(Vec::new())
                } else {
                    row.scores.clone()
                },
            })
        })
        .collect();
    all_candidates.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));

    Ok(SessionDetail {
        jd_id,
        jd_title,
        jd_department: first.jd_department.clone().unwrap_or_default(),
        jd_location: first.jd_location.clone().unwrap_or_default(),
        jd_content: first.jd_content.clone().unwrap_or_default(),
        rubric_id: first.rubric_id.clone(),
        rubric_title: first.rubric_title.clone(),
        rubric_metrics: rubric_metrics(first),
        all_candidates,
    })
}
