use serde_json::{Map, Value};
use thiserror::Error;

use crate::agent_client::strip_json_fence;

#[derive(Debug, Error, PartialEq)]
pub enum EvaluationParseError {
    #[error("reply is not a JSON object")]
    NotJson,

    #[error("Invalid evaluation structure: missing scores array")]
    MissingScores,

    #[error("Invalid evaluation structure: missing overall_score_out_of_10")]
    MissingOverallScore,
}

/// An evaluation as returned by the agent. `body` is the full object so
/// fields we do not model are passed through to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvaluation {
    pub overall_score: f64,
    pub scores: Value,
    pub summary: String,
    pub body: Map<String, Value>,
}

/// Parses the evaluation agent's text reply.
///
/// A fenced block is unwrapped first. When the text still is not JSON, the
/// slice between the first `{` and the last `}` is tried.
pub fn parse_evaluation(text: &str) -> Result<AgentEvaluation, EvaluationParseError> {
    let raw = strip_json_fence(text);
    let value = serde_json::from_str::<Value>(raw)
        .ok()
        .filter(Value::is_object)
        .or_else(|| outermost_object(raw))
        .ok_or(EvaluationParseError::NotJson)?;

    let Value::Object(body) = value else {
        return Err(EvaluationParseError::NotJson);
    };

    let scores = match body.get("scores") {
        Some(scores @ Value::Array(_)) => scores.clone(),
        _ => return Err(EvaluationParseError::MissingScores),
    };
    let overall_score = body
        .get("overall_score_out_of_10")
        .and_then(Value::as_f64)
        .ok_or(EvaluationParseError::MissingOverallScore)?;
    let summary = body
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(AgentEvaluation {
        overall_score,
        scores,
        summary,
        body,
    })
}

fn outermost_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&raw[start..=end])
        .ok()
        .filter(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "candidate_name": "Ada",
        "rubric_id": "r1",
        "rubric_title": "Technical Depth",
        "scores": [{"label": "Technical Skills", "weight": 60, "score_out_of_10": 9, "justification": "Strong"}],
        "overall_score_out_of_10": 8.4,
        "summary": "Excellent fit"
    }"#;

    #[test]
    fn test_plain_json() {
        let eval = parse_evaluation(VALID).unwrap();
        assert_eq!(eval.overall_score, 8.4);
        assert_eq!(eval.summary, "Excellent fit");
        assert_eq!(eval.body["candidate_name"], "Ada");
        assert_eq!(eval.scores.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_fenced_json() {
        let text = format!("Here is the evaluation:\n```json\n{VALID}\n```");
        assert_eq!(parse_evaluation(&text).unwrap().overall_score, 8.4);
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = format!("Evaluation follows. {VALID} Let me know if you need more.");
        assert_eq!(parse_evaluation(&text).unwrap().body["rubric_id"], "r1");
    }

    #[test]
    fn test_missing_scores() {
        let text = r#"{"overall_score_out_of_10": 7, "summary": "ok"}"#;
        assert_eq!(parse_evaluation(text), Err(EvaluationParseError::MissingScores));
    }

    #[test]
    fn test_non_numeric_overall_score() {
        let text = r#"{"scores": [], "overall_score_out_of_10": "7/10"}"#;
        assert_eq!(
            parse_evaluation(text),
            Err(EvaluationParseError::MissingOverallScore)
        );
    }

    #[test]
    fn test_not_json() {
        assert_eq!(
            parse_evaluation("I am unable to evaluate this candidate."),
            Err(EvaluationParseError::NotJson)
        );
    }
}
