/// Agent client: the single point of entry for calls to the hosted inference API.
///
/// Every agent interaction (asset upload, chat) goes through this module. The
/// API key is supplied per call because it belongs to the requesting user.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use reqwest::{multipart, Body, Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const UPLOAD_PATH: &str = "/v3/assets/upload";
const CHAT_PATH: &str = "/v3/inference/chat/";
const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("No asset ID received")]
    MissingAssetId,
}

impl AgentError {
    /// Upstream status code, if the agent answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AgentError::Api { status, .. } => Some(*status),
            AgentError::Http(e) => e.status().map(|s| s.as_u16()),
            AgentError::MissingAssetId => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    agent_id: &'a str,
    session_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    assets: Option<Vec<String>>,
}

/// One chat turn with an agent.
#[derive(Debug, Clone)]
pub struct ChatMessage<'a> {
    pub user_id: &'a str,
    pub agent_id: &'a str,
    pub session_id: &'a str,
    pub message: &'a str,
    pub assets: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
    retry_base_delay: Duration,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_base_delay: RETRY_BASE_DELAY,
        })
    }

    #[cfg(test)]
    fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Uploads a file as an agent asset and returns its asset id.
    pub async fn upload_asset(
        &self,
        api_key: &str,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, AgentError> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        let body: Value = self
            .send_with_retry(|| {
                let part =
                    multipart::Part::stream_with_length(Body::from(bytes.clone()), bytes.len() as u64)
                        .file_name(file_name.to_string());
                self.client
                    .post(&url)
                    .header("x-api-key", api_key)
                    .multipart(multipart::Form::new().part("files", part))
            })
            .await?;

        asset_id_from(&body).ok_or(AgentError::MissingAssetId)
    }

    /// Sends a chat message and returns the full JSON body of the agent reply.
    pub async fn chat(&self, api_key: &str, msg: ChatMessage<'_>) -> Result<Value, AgentError> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let request_body = ChatRequest {
            user_id: msg.user_id,
            agent_id: msg.agent_id,
            session_id: msg.session_id,
            message: msg.message,
            assets: msg.assets,
        };

        self.send_with_retry(|| {
            self.client
                .post(&url)
                .header("x-api-key", api_key)
                .json(&request_body)
        })
        .await
    }

    /// Retries on 429, 5xx and transport errors with exponential backoff.
    /// Any other non-success status fails immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<Value, AgentError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<AgentError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "Agent call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AgentError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Agent API returned {}: {}", status, body);
                last_error = Some(AgentError::Api {
                    status: status.as_u16(),
                    body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AgentError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: Value = response.json().await?;
            debug!("Agent call succeeded ({})", status);
            return Ok(body);
        }

        Err(last_error.unwrap_or(AgentError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            body: format!("gave up after {MAX_RETRIES} attempts"),
        }))
    }
}

fn asset_id_from(body: &Value) -> Option<String> {
    body.get("results")?
        .get(0)?
        .get("asset_id")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// The agent's text reply (`response` field), or an empty string.
pub fn response_text(body: &Value) -> &str {
    body.get("response").and_then(Value::as_str).unwrap_or("")
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Builds a chat session id: `{prefix}-{unix_millis}-{7 random chars}`.
pub fn agent_session_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, unix_millis(), &random[..7])
}

/// Returns the body of the first ```json fenced block in `text`, trimmed.
/// Text without such a block is returned trimmed.
pub fn strip_json_fence(text: &str) -> &str {
    const OPEN: &str = "```json";
    if let Some(start) = text.find(OPEN) {
        let rest = &text[start + OPEN.len()..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_message<'a>(message: &'a str) -> ChatMessage<'a> {
        ChatMessage {
            user_id: "recruiter@example.com",
            agent_id: "agent-1",
            session_id: "agent-1-1-abcdefg",
            message,
            assets: None,
        }
    }

    #[test]
    fn test_strip_json_fence_with_surrounding_prose() {
        let input = "Here you go:\n```json\n{\"name\": \"Ada\"}\n```\nThanks!";
        assert_eq!(strip_json_fence(input), "{\"name\": \"Ada\"}");
    }

    #[test]
    fn test_strip_json_fence_without_fence() {
        assert_eq!(strip_json_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_json_fence_unterminated_is_left_alone() {
        let input = "```json\n{\"a\": 1}";
        assert_eq!(strip_json_fence(input), input);
    }

    #[test]
    fn test_agent_session_id_shape() {
        let id = agent_session_id("agent-1");
        let parts: Vec<&str> = id.rsplitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 7);
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2], "agent-1");
    }

    #[test]
    fn test_asset_id_from_results() {
        let body = json!({"results": [{"asset_id": "asset-42"}]});
        assert_eq!(asset_id_from(&body).as_deref(), Some("asset-42"));
        assert_eq!(asset_id_from(&json!({"results": []})), None);
    }

    #[tokio::test]
    async fn test_chat_sends_api_key_and_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(header("x-api-key", "secret"))
            .and(body_partial_json(json!({
                "agent_id": "agent-1",
                "message": "hello"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri()).unwrap();
        let body = client.chat("secret", chat_message("hello")).await.unwrap();
        assert_eq!(response_text(&body), "hi");
    }

    #[tokio::test]
    async fn test_chat_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri()).unwrap();
        let err = client.chat("nope", chat_message("hello")).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_chat_retries_after_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri())
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(5));
        let body = client.chat("secret", chat_message("hello")).await.unwrap();
        assert_eq!(response_text(&body), "ok");
    }

    #[tokio::test]
    async fn test_chat_gives_up_with_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri())
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(5));
        let err = client.chat("secret", chat_message("hello")).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_rate_limited_upload_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [{"asset_id": "asset-9"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri())
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(5));
        let id = client
            .upload_asset("secret", "cv.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert_eq!(id, "asset-9");
    }

    #[tokio::test]
    async fn test_unreachable_agent_fails_without_status() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = AgentClient::new(uri)
            .unwrap()
            .with_retry_base_delay(Duration::from_millis(5));
        let err = client.chat("secret", chat_message("hello")).await.unwrap_err();
        assert!(matches!(err, AgentError::Http(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_upload_asset_returns_first_asset_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .and(header("x-api-key", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [{"asset_id": "asset-7"}]})),
            )
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri()).unwrap();
        let id = client
            .upload_asset("secret", "cv.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert_eq!(id, "asset-7");
    }

    #[tokio::test]
    async fn test_upload_asset_without_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let client = AgentClient::new(server.uri()).unwrap();
        let err = client
            .upload_asset("secret", "cv.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingAssetId));
    }
}
