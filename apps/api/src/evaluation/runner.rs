//! Bounded fan-out of candidate evaluations.
//!
//! Every selected candidate is evaluated independently; at most
//! `concurrency` evaluations are in flight at once. A failure is recorded
//! against its candidate and never aborts the rest of the batch.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent_client::{agent_session_id, response_text, AgentClient, AgentError, ChatMessage};
use crate::evaluation::parser::{parse_evaluation, AgentEvaluation};
use crate::evaluation::prompts::build_evaluation_prompt;
use crate::models::candidate::CandidateRow;
use crate::models::rubric::Rubric;

// ────────────────────────────────────────────────────────────────────────────
// Evaluator trait
// ────────────────────────────────────────────────────────────────────────────

/// Scores one candidate. Errors are the message reported to the client.
#[async_trait]
pub trait CandidateEvaluator: Send + Sync {
    async fn evaluate(&self, candidate: &CandidateRow) -> Result<AgentEvaluation, String>;
}

/// Evaluator backed by the hosted evaluation agent.
pub struct AgentEvaluator {
    pub agent: AgentClient,
    pub api_key: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub agent_id: String,
    pub jd_content: String,
    pub rubric: Rubric,
}

#[async_trait]
impl CandidateEvaluator for AgentEvaluator {
    async fn evaluate(&self, candidate: &CandidateRow) -> Result<AgentEvaluation, String> {
        info!("Evaluating candidate {}", candidate.name);
        let prompt = build_evaluation_prompt(
            &self.jd_content,
            &self.rubric,
            &candidate.name,
            &candidate.parsed_content,
        );
        let session_id = agent_session_id(&self.user_id.to_string());

        let body = self
            .agent
            .chat(
                &self.api_key,
                ChatMessage {
                    user_id: &self.user_email,
                    agent_id: &self.agent_id,
                    session_id: &session_id,
                    message: &prompt,
                    assets: None,
                },
            )
            .await
            .map_err(|e| match e {
                AgentError::Api { status, .. } => format!("API request failed: {status}"),
                other => other.to_string(),
            })?;

        let text = response_text(&body);
        parse_evaluation(text).map_err(|e| {
            let snippet: String = text.chars().take(500).collect();
            warn!("Could not parse evaluation for {}: {e}; reply: {snippet}", candidate.name);
            "Failed to parse AI evaluation response".to_string()
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fan-out
// ────────────────────────────────────────────────────────────────────────────

pub struct EvaluationOutcome {
    pub candidate: CandidateRow,
    pub result: Result<AgentEvaluation, String>,
}

/// Evaluates all candidates with at most `concurrency` calls in flight.
/// Outcomes arrive in completion order.
pub async fn evaluate_all(
    evaluator: &dyn CandidateEvaluator,
    candidates: Vec<CandidateRow>,
    concurrency: usize,
) -> Vec<EvaluationOutcome> {
    let semaphore = Semaphore::new(concurrency.max(1));
    let mut pending: FuturesUnordered<_> = candidates
        .into_iter()
        .map(|candidate| {
            let semaphore = &semaphore;
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => evaluator.evaluate(&candidate).await,
                    Err(e) => Err(e.to_string()),
                };
                EvaluationOutcome { candidate, result }
            }
        })
        .collect();

    let mut outcomes = Vec::new();
    while let Some(outcome) = pending.next().await {
        outcomes.push(outcome);
    }
    outcomes
}

// ────────────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────────────

pub struct EvaluatedCandidate {
    pub candidate_id: Uuid,
    pub evaluation: AgentEvaluation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvaluation {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub error: String,
}

/// Orders by overall score, highest first, and attaches `candidateId` and
/// a 1-based `rank` to each agent result.
pub fn rank(mut evaluated: Vec<EvaluatedCandidate>) -> Vec<Value> {
    evaluated.sort_by(|a, b| {
        b.evaluation
            .overall_score
            .total_cmp(&a.evaluation.overall_score)
    });

    evaluated
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            let mut body = e.evaluation.body;
            body.insert("candidateId".to_string(), Value::String(e.candidate_id.to_string()));
            body.insert("rank".to_string(), Value::from(i + 1));
            Value::Object(body)
        })
        .collect()
}
