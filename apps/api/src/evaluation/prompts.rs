// Prompt text for the evaluation agent.

use crate::models::rubric::Rubric;

/// Evaluation prompt template. Placeholders are `{jd_content}`,
/// `{rubric_title}`, `{rubric_description}`, `{weightages}`, `{criteria}`,
/// `{resume}`, `{candidate_name}` and `{rubric_id}`.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate this candidate against the job description and rubric.

**Job Description:**
{jd_content}

**Evaluation Rubric:**
Title: {rubric_title}
Description: {rubric_description}

Metrics & Weightages:
{weightages}

Evaluation Criteria:
{criteria}

**Candidate Resume:**
{resume}

Please evaluate this candidate and provide a structured JSON response with:
1. Score out of 10 for each metric (with justification)
2. Overall score out of 10 (weighted average)
3. Summary of the evaluation

Return ONLY valid JSON in this exact format:
{
  "candidate_name": "{candidate_name}",
  "rubric_id": "{rubric_id}",
  "rubric_title": "{rubric_title}",
  "scores": [
    {
      "label": "metric name",
      "weight": weight_percentage,
      "score_out_of_10": score,
      "justification": "explanation"
    }
  ],
  "overall_score_out_of_10": calculated_score,
  "summary": "brief evaluation summary"
}"#;

/// Fills the template for one candidate in a single pass, so braces inside
/// the JD or resume text are never taken for placeholders.
pub fn build_evaluation_prompt(
    jd_content: &str,
    rubric: &Rubric,
    candidate_name: &str,
    resume: &str,
) -> String {
    let weightages = rubric
        .weightages
        .iter()
        .map(|w| format!("- {}: {}%", w.label, w.weight_text()))
        .collect::<Vec<_>>()
        .join("\n");
    let criteria = rubric
        .criteria
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::with_capacity(EVALUATION_PROMPT_TEMPLATE.len() + jd_content.len() + resume.len());
    let mut rest = EVALUATION_PROMPT_TEMPLATE;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let end = tail.find('}').map(|e| e + 1).unwrap_or(tail.len());
        let value = match &tail[..end] {
            "{jd_content}" => Some(jd_content),
            "{rubric_title}" => Some(rubric.title.as_str()),
            "{rubric_description}" => Some(rubric.description.as_str()),
            "{weightages}" => Some(weightages.as_str()),
            "{criteria}" => Some(criteria.as_str()),
            "{resume}" => Some(resume),
            "{candidate_name}" => Some(candidate_name),
            "{rubric_id}" => Some(rubric.id.as_str()),
            _ => None,
        };
        match value {
            Some(v) => {
                out.push_str(v);
                rest = &tail[end..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rubric::Weightage;
    use serde_json::json;

    fn rubric() -> Rubric {
        Rubric {
            id: "rubric-tech".to_string(),
            title: "Technical Depth".to_string(),
            description: "Weights hands-on engineering".to_string(),
            weightages: vec![
                Weightage {
                    label: "Technical Skills".to_string(),
                    weight: json!(60),
                },
                Weightage {
                    label: "Communication".to_string(),
                    weight: json!(40),
                },
            ],
            criteria: vec!["Ships production code".to_string(), "Mentors others".to_string()],
        }
    }

    #[test]
    fn test_prompt_lists_weightages_and_criteria() {
        let prompt = build_evaluation_prompt("Senior Rust role", &rubric(), "Ada", "Ada's resume");
        assert!(prompt.starts_with("Evaluate this candidate against the job description and rubric."));
        assert!(prompt.contains("**Job Description:**\nSenior Rust role\n"));
        assert!(prompt.contains("- Technical Skills: 60%\n- Communication: 40%"));
        assert!(prompt.contains("1. Ships production code\n2. Mentors others"));
        assert!(prompt.contains("\"candidate_name\": \"Ada\""));
        assert!(prompt.contains("\"rubric_id\": \"rubric-tech\""));
        assert!(prompt.contains("Title: Technical Depth\n"));
        assert!(prompt.ends_with("\"summary\": \"brief evaluation summary\"\n}"));
    }

    #[test]
    fn test_resume_braces_are_left_untouched() {
        let resume = "Built {rubric_id} parser in {Rust}";
        let prompt = build_evaluation_prompt("JD", &rubric(), "Ada", resume);
        assert!(prompt.contains("**Candidate Resume:**\nBuilt {rubric_id} parser in {Rust}\n"));
    }

    #[test]
    fn test_fractional_weight_is_kept() {
        let mut r = rubric();
        r.weightages[0].weight = json!(33.5);
        let prompt = build_evaluation_prompt("JD", &r, "Ada", "cv");
        assert!(prompt.contains("- Technical Skills: 33.5%"));
    }

    #[test]
    fn test_string_weight_is_rendered_bare() {
        let mut r = rubric();
        r.weightages[1].weight = json!("40");
        let prompt = build_evaluation_prompt("JD", &r, "Ada", "cv");
        assert!(prompt.contains("- Communication: 40%"));
    }
}
