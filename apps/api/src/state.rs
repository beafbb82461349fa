use sqlx::PgPool;

use crate::agent_client::AgentClient;
use crate::cache::RubricCache;
use crate::config::Config;
use crate::storage::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: DocumentStore,
    pub rubric_cache: RubricCache,
    pub agent: AgentClient,
    pub config: Config,
}
