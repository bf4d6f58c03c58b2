//! Bearer access-token authentication.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;
use uuid::Uuid;

use crate::types::UserAccount;

use super::AppState;
use super::error::ApiError;

const TOKEN_PREFIX: &str = "th_";

/// The account behind a request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserAccount);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("missing bearer token"))?;

        if !token.starts_with(TOKEN_PREFIX) {
            return Err(ApiError::Unauthorized("invalid access token"));
        }

        let user = state
            .db
            .find_user_by_token_hash(&hash_token(token))
            .await?
            .ok_or(ApiError::Unauthorized("invalid access token"))?;

        debug!(user_id = %user.id, "authenticated");
        Ok(AuthUser(user))
    }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A fresh plaintext token: `th_` followed by 32 hex characters, e.g.
/// `th_3f2c9a1e0b7d4c6a8e5f1b2d3c4a5e6f`.
///
/// Only the SHA-256 hex digest is persisted; the plaintext is shown once.
pub fn generate_token() -> String {
    format!("{}{}", TOKEN_PREFIX, Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time secret comparison.
pub fn secrets_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}
