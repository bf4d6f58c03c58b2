//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::providers::ProviderError;
use crate::quota::{AccessDecision, GateError};
use crate::store::StoreError;
use crate::types::{Feature, Tier};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid credentials. Checked before any quota lookup.
    Unauthorized(&'static str),
    BadRequest(String),
    /// Quota exhausted; the external call was not made.
    LimitReached(AccessDecision),
    /// The external provider failed; no quota was consumed.
    Upstream(Feature, ProviderError),
    /// A dependency (usage store, cron secret) is unavailable. Access is denied.
    Unavailable(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn upstream(feature: Feature) -> impl FnOnce(ProviderError) -> ApiError {
        move |error| match error {
            ProviderError::InvalidInput(message) => ApiError::BadRequest(message),
            other => ApiError::Upstream(feature, other),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::InvalidInput(message) => ApiError::BadRequest(message),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(error: GateError) -> Self {
        match error {
            GateError::Store(e) => ApiError::Unavailable(format!("usage store: {}", e)),
            GateError::UnknownLimitKey(key) => {
                ApiError::BadRequest(format!("unknown feature: {}", key))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Unavailable(format!("store: {}", error))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal(error)
    }
}

/// User-facing text for an exhausted quota.
pub fn limit_message(feature: Feature, tier: Tier) -> String {
    let hint = match tier {
        Tier::Free => "Upgrade to Pro or Master for a higher daily limit.",
        Tier::Pro => "Upgrade to Master for a higher daily limit.",
        Tier::Master => "Your quota resets at midnight UTC.",
    };
    format!(
        "You've reached your daily limit for the {}. {}",
        feature.display_name(),
        hint
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::LimitReached(decision) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": limit_message(decision.feature, decision.tier),
                    "feature": decision.feature,
                    "tier": decision.tier,
                    "limit": decision.limit,
                    "remaining": decision.remaining,
                })),
            )
                .into_response(),
            ApiError::Upstream(feature, error) => {
                warn!(feature = %feature, error = %error, "provider call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": format!(
                            "The {} is temporarily unavailable. Please try again later.",
                            feature.display_name()
                        )
                    })),
                )
                    .into_response()
            }
            ApiError::Unavailable(detail) => {
                error!(detail = %detail, "dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "Service temporarily unavailable" })),
                )
                    .into_response()
            }
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized("no token"), StatusCode::UNAUTHORIZED),
            (ApiError::BadRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (
                ApiError::LimitReached(AccessDecision::new(Feature::AiChat, Tier::Free, 10, 10)),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::Upstream(Feature::AiChat, ProviderError::RateLimited("groq")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Unavailable("db".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let error = ApiError::upstream(Feature::UrlShortener)(ProviderError::InvalidInput(
            "bad url".to_string(),
        ));
        assert!(matches!(error, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_limit_message_suggests_next_tier() {
        assert!(limit_message(Feature::AiChat, Tier::Free).contains("Upgrade to Pro"));
        assert!(limit_message(Feature::AiChat, Tier::Pro).contains("Upgrade to Master"));
        assert!(limit_message(Feature::AiChat, Tier::Master).contains("midnight UTC"));
    }
}
