//! The check -> call -> record sequence shared by every metered tool.

use std::future::Future;

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::providers::ProviderError;
use crate::types::{Feature, UserAccount};

use super::AppState;
use super::error::{ApiError, ApiResult};

const LIMIT_HEADER: &str = "x-quota-limit";
const REMAINING_HEADER: &str = "x-quota-remaining";

/// A tool result plus the caller's standing after this use.
#[derive(Debug)]
pub struct Metered<T> {
    pub body: T,
    pub limit: u32,
    pub remaining: u32,
}

impl<T> Metered<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Metered<U> {
        Metered {
            body: f(self.body),
            limit: self.limit,
            remaining: self.remaining,
        }
    }
}

impl<T: IntoResponse> IntoResponse for Metered<T> {
    fn into_response(self) -> Response {
        let mut response = self.body.into_response();
        let headers = response.headers_mut();
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining));
        response
    }
}

/// Run `call` only if `user` has quota left for `feature`, and count it only if it succeeds.
///
/// `call` is not invoked when access is denied or the quota check fails.
pub async fn metered<T, F, Fut>(
    state: &AppState,
    user: &UserAccount,
    feature: Feature,
    call: F,
) -> ApiResult<Metered<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let decision = state.quota.gate().check_access(user.id, feature).await?;

    if !decision.allowed {
        info!(
            user_id = %user.id,
            feature = %feature,
            tier = %decision.tier,
            limit = decision.limit,
            "daily limit reached"
        );
        return Err(ApiError::LimitReached(decision));
    }

    let body = call().await.map_err(ApiError::upstream(feature))?;

    if !state.quota.for_user(user.id).increment_feature_usage(feature).await {
        warn!(user_id = %user.id, feature = %feature, "served without recording usage");
    }

    Ok(Metered {
        body,
        limit: decision.limit,
        remaining: decision.remaining.saturating_sub(1),
    })
}
