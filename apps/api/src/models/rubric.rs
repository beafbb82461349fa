use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Weightage {
    pub label: String,
    /// Percentage of the overall score, kept as the agent sent it
    /// (number or numeric string).
    pub weight: Value,
}

impl Weightage {
    fn from_value(value: &Value) -> Self {
        Self {
            label: value.get("label").map(display_text).unwrap_or_default(),
            weight: value.get("weight").cloned().unwrap_or(Value::Null),
        }
    }

    pub fn weight_text(&self) -> String {
        display_text(&self.weight)
    }
}

/// A weighted scoring rubric as produced by the rubrics agent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rubric {
    pub id: String,
    pub title: String,
    pub description: String,
    pub weightages: Vec<Weightage>,
    pub criteria: Vec<String>,
}

impl Rubric {
    /// Reads a rubric from agent or client JSON. `None` when it lacks the
    /// fields every generated rubric carries.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !has_required_fields(value) {
            return None;
        }
        let text = |key: &str| value.get(key).map(display_text).unwrap_or_default();
        let list = |key: &str| value.get(key).and_then(Value::as_array);

        Some(Self {
            id: text("id"),
            title: text("title"),
            description: text("description"),
            weightages: list("weightages")?.iter().map(Weightage::from_value).collect(),
            criteria: list("criteria")?.iter().map(display_text).collect(),
        })
    }
}

/// Truthy id, title and description plus weightages and criteria arrays.
pub fn has_required_fields(rubric: &Value) -> bool {
    ["id", "title", "description"]
        .iter()
        .all(|key| rubric.get(*key).is_some_and(is_truthy))
        && rubric.get("weightages").is_some_and(Value::is_array)
        && rubric.get("criteria").is_some_and(Value::is_array)
}

/// Loose presence check: null, false, 0 and "" count as absent.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strings as-is, anything else as its JSON text.
fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weights_keep_their_text() {
        let rubric = Rubric::from_value(&json!({
            "id": 7,
            "title": "Technical Depth",
            "description": "Hands-on engineering",
            "weightages": [
                {"label": "Skills", "weight": "40"},
                {"label": "Delivery", "weight": 33.5},
                {"label": "Culture", "weight": 26}
            ],
            "criteria": ["Ships code", 3]
        }))
        .unwrap();

        assert_eq!(rubric.id, "7");
        let weights: Vec<String> = rubric.weightages.iter().map(Weightage::weight_text).collect();
        assert_eq!(weights, ["40", "33.5", "26"]);
        assert_eq!(rubric.criteria, ["Ships code", "3"]);
    }

    #[test]
    fn test_incomplete_rubric_is_rejected() {
        assert_eq!(Rubric::from_value(&json!({"id": "r1", "title": "T"})), None);
        assert_eq!(Rubric::from_value(&json!("r1")), None);
    }
}
