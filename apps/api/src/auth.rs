use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// Identity headers sent by the frontend on every API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub external_id: String,
    pub email: String,
    pub org_id: String,
    pub token: String,
}

/// The authenticated caller. `token` is the caller's agent API key and only
/// lives for the duration of the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub fn identity_from_headers(headers: &HeaderMap) -> Option<IdentityHeaders> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(IdentityHeaders {
        external_id: get("x-user-id")?,
        email: get("x-email")?,
        org_id: get("x-org-id")?,
        token: get("x-token")?,
    })
}

/// Creates the user on first sight and refreshes email/org afterwards.
pub async fn upsert_user(pool: &sqlx::PgPool, identity: &IdentityHeaders) -> Result<User, AppError> {
    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, external_id, email, org_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (external_id)
        DO UPDATE SET email = EXCLUDED.email, org_id = EXCLUDED.org_id, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&identity.external_id)
    .bind(&identity.email)
    .bind(&identity.org_id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = identity_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user = upsert_user(&state.db, &identity).await?;

        debug!("Authenticated {} (org {})", user.external_id, user.org_id);

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            token: identity.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn full_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user-123"));
        headers.insert("x-email", HeaderValue::from_static("hr@example.com"));
        headers.insert("x-org-id", HeaderValue::from_static("org-9"));
        headers.insert("x-token", HeaderValue::from_static("sk-live"));
        headers
    }

    #[test]
    fn test_all_headers_present() {
        let identity = identity_from_headers(&full_headers()).unwrap();
        assert_eq!(identity.external_id, "user-123");
        assert_eq!(identity.email, "hr@example.com");
        assert_eq!(identity.org_id, "org-9");
        assert_eq!(identity.token, "sk-live");
    }

    #[test]
    fn test_each_header_is_required() {
        for name in ["x-user-id", "x-email", "x-org-id", "x-token"] {
            let mut headers = full_headers();
            headers.remove(name);
            assert!(identity_from_headers(&headers).is_none(), "{name} should be required");
        }
    }

    #[test]
    fn test_blank_header_counts_as_missing() {
        let mut headers = full_headers();
        headers.insert("x-token", HeaderValue::from_static("   "));
        assert!(identity_from_headers(&headers).is_none());
    }
}
