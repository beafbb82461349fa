use redis::{AsyncCommands, RedisResult};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

/// Redis cache of generated rubric sets, keyed by user and JD text.
/// Failures are logged and treated as a miss.
#[derive(Clone)]
pub struct RubricCache {
    client: redis::Client,
    ttl_secs: u64,
}

/// `rubrics:{user}:{sha256 of the trimmed JD text}`.
pub fn cache_key(user_id: Uuid, content: &str) -> String {
    let digest = Sha256::digest(content.trim().as_bytes());
    format!("rubrics:{}:{:x}", user_id, digest)
}

impl RubricCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    pub async fn get(&self, user_id: Uuid, content: &str) -> Option<Value> {
        let key = cache_key(user_id, content);
        match self.read(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(rubrics) => {
                    debug!("Rubric cache hit for {key}");
                    Some(rubrics)
                }
                Err(e) => {
                    warn!("Discarding unreadable cached rubrics at {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Rubric cache read failed: {e}");
                None
            }
        }
    }

    pub async fn put(&self, user_id: Uuid, content: &str, rubrics: &Value) {
        let key = cache_key(user_id, content);
        if let Err(e) = self.write(&key, rubrics.to_string()).await {
            warn!("Rubric cache write failed: {e}");
        }
    }

    async fn read(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    async fn write(&self, key: &str, value: String) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex(key, value, self.ttl_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_and_user_scoped() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let a = cache_key(user, "Senior Rust Engineer");
        assert_eq!(a, cache_key(user, "  Senior Rust Engineer\n"));
        assert_ne!(a, cache_key(other, "Senior Rust Engineer"));
        assert_ne!(a, cache_key(user, "Junior Rust Engineer"));
        assert!(a.starts_with(&format!("rubrics:{user}:")));
    }

    #[test]
    fn test_cache_key_digest_is_fixed() {
        let key = cache_key(Uuid::nil(), "abc");
        assert_eq!(
            key,
            "rubrics:00000000-0000-0000-0000-000000000000:\
             ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
