use serde_json::Value;
use thiserror::Error;

use crate::agent_client::strip_json_fence;
use crate::models::rubric::{has_required_fields, is_truthy};

/// Number of rubrics the agent must return per job description.
pub const RUBRIC_COUNT: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum RubricError {
    #[error("Invalid rubrics format received from AI agent")]
    InvalidFormat,

    #[error("Rubrics missing required fields")]
    MissingFields,
}

/// Pulls the rubric list out of a rubrics agent reply and validates it.
///
/// The agent has been seen to answer in several shapes; the first that
/// matches wins:
/// 1. a top-level `rubrics` array
/// 2. `response.rubrics`
/// 3. a `message`/`response` string holding JSON (fenced or not), either an
///    object with `rubrics` or the list itself
/// 4. a `message`/`response` object with `rubrics`
pub fn extract_rubrics(body: &Value) -> Result<Vec<Value>, RubricError> {
    let rubrics = find_rubrics(body).ok_or(RubricError::InvalidFormat)?;
    let rubrics = match rubrics {
        Value::Array(items) if items.len() == RUBRIC_COUNT => items,
        _ => return Err(RubricError::InvalidFormat),
    };

    if !rubrics.iter().all(has_required_fields) {
        return Err(RubricError::MissingFields);
    }
    Ok(rubrics)
}

fn find_rubrics(body: &Value) -> Option<Value> {
    if let Some(rubrics @ Value::Array(_)) = body.get("rubrics") {
        return Some(rubrics.clone());
    }
    if let Some(rubrics @ Value::Array(_)) = body.get("response").and_then(|r| r.get("rubrics")) {
        return Some(rubrics.clone());
    }

    let content = ["message", "response"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|v| is_truthy(v))?;

    match content {
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(strip_json_fence(text)).ok()?;
            match parsed.get("rubrics") {
                Some(rubrics) if is_truthy(rubrics) => Some(rubrics.clone()),
                _ => Some(parsed),
            }
        }
        other => other.get("rubrics").filter(|r| is_truthy(r)).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rubric(id: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Rubric {id}"),
            "description": "Balanced technical focus",
            "weightages": [{"label": "Technical Skills", "weight": 40}],
            "criteria": ["Has shipped production Rust"]
        })
    }

    fn three() -> Value {
        json!([rubric("r1"), rubric("r2"), rubric("r3")])
    }

    #[test]
    fn test_top_level_rubrics() {
        let body = json!({ "rubrics": three() });
        assert_eq!(extract_rubrics(&body).unwrap().len(), 3);
    }

    #[test]
    fn test_nested_response_rubrics() {
        let body = json!({ "response": { "rubrics": three() } });
        assert_eq!(extract_rubrics(&body).unwrap()[1]["id"], "r2");
    }

    #[test]
    fn test_fenced_response_string() {
        let text = format!("```json\n{}\n```", json!({ "rubrics": three() }));
        let body = json!({ "response": text });
        assert_eq!(extract_rubrics(&body).unwrap()[2]["id"], "r3");
    }

    #[test]
    fn test_response_string_holding_bare_list() {
        let body = json!({ "response": three().to_string() });
        assert_eq!(extract_rubrics(&body).unwrap().len(), 3);
    }

    #[test]
    fn test_message_takes_precedence_over_response() {
        let body = json!({
            "message": json!({ "rubrics": three() }).to_string(),
            "response": "ignored"
        });
        assert!(extract_rubrics(&body).is_ok());
    }

    #[test]
    fn test_wrong_count_is_invalid() {
        let body = json!({ "rubrics": [rubric("r1"), rubric("r2")] });
        assert_eq!(extract_rubrics(&body), Err(RubricError::InvalidFormat));
    }

    #[test]
    fn test_unparseable_text_is_invalid() {
        let body = json!({ "response": "Sorry, I cannot help with that." });
        assert_eq!(extract_rubrics(&body), Err(RubricError::InvalidFormat));
    }

    #[test]
    fn test_missing_fields() {
        let mut broken = rubric("r3");
        broken["criteria"] = json!("not a list");
        let body = json!({ "rubrics": [rubric("r1"), rubric("r2"), broken] });
        assert_eq!(extract_rubrics(&body), Err(RubricError::MissingFields));

        let mut untitled = rubric("r3");
        untitled["title"] = json!("");
        let body = json!({ "rubrics": [rubric("r1"), rubric("r2"), untitled] });
        assert_eq!(extract_rubrics(&body), Err(RubricError::MissingFields));
    }
}
