use anyhow::{Context, Result};

pub const DEFAULT_AGENT_BASE_URL: &str = "https://agent-prod.studio.lyzr.ai";
const DEFAULT_EVALUATION_CONCURRENCY: usize = 3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_RUBRIC_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub agents: AgentConfig,
    /// Maximum number of evaluation calls in flight per request.
    pub evaluation_concurrency: usize,
    pub max_upload_bytes: usize,
    pub rubric_cache_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

/// Endpoints and agent ids of the hosted inference API.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub candidates_agent_id: String,
    pub rubrics_agent_id: String,
    pub evaluation_agent_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let evaluation_concurrency = match lookup("EVALUATION_CONCURRENCY") {
            Some(raw) => raw
                .parse::<usize>()
                .context("EVALUATION_CONCURRENCY must be a positive integer")?,
            None => DEFAULT_EVALUATION_CONCURRENCY,
        };
        if evaluation_concurrency == 0 {
            anyhow::bail!("EVALUATION_CONCURRENCY must be at least 1");
        }

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            redis_url: require("REDIS_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            agents: AgentConfig {
                base_url: lookup("LYZR_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_AGENT_BASE_URL.to_string()),
                candidates_agent_id: require("LYZR_CANDIDATES_AGENT_ID")?,
                rubrics_agent_id: require("LYZR_RUBRICS_AGENT_ID")?,
                evaluation_agent_id: require("LYZR_EVALUATE_CANDIDATES_AGENT_ID")?,
            },
            evaluation_concurrency,
            max_upload_bytes: match lookup("MAX_UPLOAD_BYTES") {
                Some(raw) => raw
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
            rubric_cache_ttl_secs: match lookup("RUBRIC_CACHE_TTL_SECS") {
                Some(raw) => raw
                    .parse::<u64>()
                    .context("RUBRIC_CACHE_TTL_SECS must be a number of seconds")?,
                None => DEFAULT_RUBRIC_CACHE_TTL_SECS,
            },
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
