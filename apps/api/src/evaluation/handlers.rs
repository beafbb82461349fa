use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::agent_client::unix_millis;
use crate::auth::AuthUser;
use crate::candidates::repository as candidates;
use crate::errors::AppError;
use crate::evaluation::repository::{self, NewEvaluation};
use crate::evaluation::runner::{
    evaluate_all, rank, AgentEvaluator, EvaluatedCandidate, FailedEvaluation,
};
use crate::job_descriptions::repository as job_descriptions;
use crate::models::rubric::Rubric;
use crate::state::AppState;

const MISSING_FIELDS: &str = "Missing required fields";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateCandidatesRequest {
    pub jd_id: Option<String>,
    pub rubric: Option<Value>,
    pub candidate_ids: Option<Vec<String>>,
}

/// A validated evaluation request.
#[derive(Debug, PartialEq)]
pub struct EvaluationTarget {
    /// `None` when the given id is not a UUID; it cannot match any JD.
    pub jd_id: Option<Uuid>,
    pub rubric: Rubric,
    pub candidate_ids: Vec<Uuid>,
}

impl EvaluateCandidatesRequest {
    pub fn validate(self) -> Result<EvaluationTarget, AppError> {
        let missing = || AppError::validation(MISSING_FIELDS);

        let jd_id = self
            .jd_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(missing)?;
        let rubric = self
            .rubric
            .as_ref()
            .and_then(Rubric::from_value)
            .ok_or_else(missing)?;
        let candidate_ids = self
            .candidate_ids
            .filter(|ids| !ids.is_empty())
            .ok_or_else(missing)?;

        Ok(EvaluationTarget {
            jd_id: Uuid::parse_str(jd_id.trim()).ok(),
            rubric,
            candidate_ids: candidate_ids
                .iter()
                .filter_map(|id| Uuid::parse_str(id.trim()).ok())
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluateCandidatesResponse {
    pub success: bool,
    pub evaluated: usize,
    pub failed: usize,
    pub results: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FailedEvaluation>>,
}

/// Session id shared by every evaluation of one request.
pub fn evaluation_session_id(jd_id: Uuid, rubric_id: &str) -> String {
    format!("{}-{}-{}", jd_id, rubric_id, unix_millis())
}

/// POST /api/evaluate-candidates
pub async fn handle_evaluate_candidates(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<EvaluateCandidatesRequest>,
) -> Result<Json<EvaluateCandidatesResponse>, AppError> {
    let target = req.validate()?;

    let jd = match target.jd_id {
        Some(id) => job_descriptions::find(&state.db, user.id, id).await?,
        None => None,
    }
    .ok_or_else(|| AppError::not_found("Job description not found"))?;

    let selected = candidates::find_many(&state.db, user.id, &target.candidate_ids).await?;
    if selected.is_empty() {
        return Err(AppError::not_found("No candidates found"));
    }

    let rubric = target.rubric;
    let session_id = evaluation_session_id(jd.id, &rubric.id);
    info!(
        "Starting evaluation session {} for {} candidates",
        session_id,
        selected.len()
    );

    let evaluator = AgentEvaluator {
        agent: state.agent.clone(),
        api_key: user.token.clone(),
        user_id: user.id,
        user_email: user.email.clone(),
        agent_id: state.config.agents.evaluation_agent_id.clone(),
        jd_content: jd.parsed_content.clone(),
        rubric: rubric.clone(),
    };
    let outcomes = evaluate_all(&evaluator, selected, state.config.evaluation_concurrency).await;

    let weightages = serde_json::to_value(&rubric.weightages).unwrap_or(Value::Null);
    let mut evaluated = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        let candidate = outcome.candidate;
        let evaluation = match outcome.result {
            Ok(evaluation) => evaluation,
            Err(message) => {
                failures.push(FailedEvaluation {
                    candidate_id: candidate.id,
                    candidate_name: candidate.name,
                    error: message,
                });
                continue;
            }
        };

        let stored = repository::insert(
            &state.db,
            NewEvaluation {
                user_id: user.id,
                session_id: session_id.clone(),
                candidate_id: candidate.id,
                jd_id: jd.id,
                rubric_id: rubric.id.clone(),
                rubric_title: rubric.title.clone(),
                rubric_weightages: weightages.clone(),
                overall_score: evaluation.overall_score,
                scores: evaluation.scores.clone(),
                summary: evaluation.summary.clone(),
            },
        )
        .await;

        match stored {
            Ok(_) => evaluated.push(EvaluatedCandidate {
                candidate_id: candidate.id,
                evaluation,
            }),
            Err(e) => {
                error!("Could not store evaluation for {}: {e}", candidate.name);
                failures.push(FailedEvaluation {
                    candidate_id: candidate.id,
                    candidate_name: candidate.name,
                    error: e.to_string(),
                });
            }
        }
    }

    let results = rank(evaluated);
    info!(
        "Evaluation session {} complete: {} evaluated, {} failed",
        session_id,
        results.len(),
        failures.len()
    );

    Ok(Json(EvaluateCandidatesResponse {
        success: true,
        evaluated: results.len(),
        failed: failures.len(),
        results,
        errors: if failures.is_empty() {
            None
        } else {
            Some(failures)
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubrics::parser::extract_rubrics;
    use serde_json::json;

    fn request(body: Value) -> EvaluateCandidatesRequest {
        serde_json::from_value(body).unwrap()
    }

    fn rubric_json() -> Value {
        json!({
            "id": "r1",
            "title": "Technical Depth",
            "description": "Hands-on engineering",
            "weightages": [{"label": "Technical Skills", "weight": 100}],
            "criteria": ["Ships code"]
        })
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let jd = Uuid::new_v4();
        let c = Uuid::new_v4();
        let target = request(json!({
            "jdId": jd.to_string(),
            "rubric": rubric_json(),
            "candidateIds": [c.to_string(), "not-a-uuid"]
        }))
        .validate()
        .unwrap();

        assert_eq!(target.jd_id, Some(jd));
        assert_eq!(target.rubric.id, "r1");
        assert_eq!(target.candidate_ids, vec![c]);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let cases = [
            json!({ "rubric": rubric_json(), "candidateIds": ["a"] }),
            json!({ "jdId": "x", "candidateIds": ["a"] }),
            json!({ "jdId": "x", "rubric": rubric_json() }),
            json!({ "jdId": "x", "rubric": rubric_json(), "candidateIds": [] }),
        ];
        for body in cases {
            let err = request(body).validate().unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == MISSING_FIELDS));
        }
    }

    #[test]
    fn test_generated_rubrics_are_accepted_for_evaluation() {
        let mut loose = rubric_json();
        loose["weightages"] = json!([
            {"label": "Technical Skills", "weight": "40"},
            {"label": "Communication", "weight": 60}
        ]);
        let body = json!({ "rubrics": [loose.clone(), rubric_json(), rubric_json()] });
        let generated = extract_rubrics(&body).unwrap();

        let target = request(json!({
            "jdId": Uuid::new_v4().to_string(),
            "rubric": generated[0],
            "candidateIds": [Uuid::new_v4().to_string()]
        }))
        .validate()
        .unwrap();

        assert_eq!(target.rubric.weightages[0].weight_text(), "40");
        assert_eq!(target.rubric.weightages[1].weight_text(), "60");
    }

    #[test]
    fn test_session_id_shape() {
        let jd = Uuid::new_v4();
        let id = evaluation_session_id(jd, "r1");
        assert!(id.starts_with(&format!("{jd}-r1-")));
        let millis = id.rsplit('-').next().unwrap();
        assert!(millis.parse::<u128>().is_ok());
    }

    #[test]
    fn test_errors_omitted_when_empty() {
        let response = EvaluateCandidatesResponse {
            success: true,
            evaluated: 0,
            failed: 0,
            results: Vec::new(),
            errors: None,
        };
        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("errors").is_none());
        assert_eq!(body["success"], true);
    }
}
