//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::providers::{
    ChatReply, ChatRequest, DetectRequest, ExecuteRequest, ExecutionResult, SeoRequest, ShortUrl,
    ShortenRequest, SpeechRequest, TranslateRequest, Translation,
};
use crate::quota::{ResetReport, UsageSummary};
use crate::tools::convert::{self, Category};
use crate::types::{Feature, ResolvedPlan, Tier, UserAccount};

use super::AppState;
use super::auth::{AuthUser, bearer_token, secrets_match};
use super::error::{ApiError, ApiResult};
use super::metered::{Metered, metered};

type AppStateRef = State<Arc<AppState>>;

pub async fn health() -> &'static str {
    "ok"
}

// ==================== Account ====================

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub account: UserAccount,
    pub plan: ResolvedPlan,
}

pub async fn me(State(state): AppStateRef, AuthUser(user): AuthUser) -> Json<MeResponse> {
    let plan = state.quota.gate().resolver().resolve_plan(user.id).await;
    Json(MeResponse {
        account: user,
        plan,
    })
}

pub async fn usage(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<UsageSummary>> {
    let summary = state.quota.gate().summary_at(user.id, Utc::now()).await?;
    Ok(Json(summary))
}

#[derive(Debug, Serialize)]
pub struct FeatureStanding {
    pub feature: Feature,
    pub tier: Tier,
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
}

/// One feature's standing. `key` is a feature id such as `ai_chat`.
pub async fn feature_usage(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<FeatureStanding>> {
    let feature: Feature = key.parse().map_err(ApiError::BadRequest)?;
    let decision = state.quota.gate().check_access(user.id, feature).await?;

    Ok(Json(FeatureStanding {
        feature: decision.feature,
        tier: decision.tier,
        allowed: decision.allowed,
        limit: decision.limit,
        remaining: decision.remaining,
    }))
}

// ==================== Cron ====================

pub async fn reset_usage(
    State(state): AppStateRef,
    headers: HeaderMap,
) -> ApiResult<Json<ResetReport>> {
    let secret = state
        .cron_secret
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("cron secret is not configured".to_string()))?;

    let given = bearer_token(&headers).ok_or(ApiError::Unauthorized("missing bearer token"))?;
    if !secrets_match(given, secret.expose_secret()) {
        warn!("reset rejected: wrong cron secret");
        return Err(ApiError::Unauthorized("invalid cron secret"));
    }

    let report = state
        .quota
        .resetter()
        .run()
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(Json(report))
}

// ==================== Unit converter ====================

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub value: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub value: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
    pub category: Category,
}

pub async fn convert(Json(request): Json<ConvertRequest>) -> ApiResult<Json<ConvertResponse>> {
    let converted = convert::try_convert(request.value, &request.from, &request.to)
        .filter(|result| result.is_finite())
        .zip(convert::category_of(&request.from));

    let Some((result, category)) = converted else {
        return Err(ApiError::BadRequest(format!(
            "cannot convert {} to {}",
            request.from, request.to
        )));
    };

    Ok(Json(ConvertResponse {
        value: request.value,
        from: request.from,
        to: request.to,
        result,
        category,
    }))
}

// ==================== Metered tools ====================

pub async fn chat(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Metered<Json<ChatReply>>> {
    request.validate()?;
    let reply = metered(&state, &user, Feature::AiChat, || {
        state.providers.chat(request)
    })
    .await?;
    Ok(reply.map(Json))
}

pub async fn detect(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<DetectRequest>,
) -> ApiResult<Metered<Json<serde_json::Value>>> {
    request.validate()?;
    let verdict = metered(&state, &user, Feature::AiDetector, || {
        state.providers.detect_ai(request)
    })
    .await?;
    Ok(verdict.map(Json))
}

pub async fn translate(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<Metered<Json<Translation>>> {
    request.validate()?;
    let translation = metered(&state, &user, Feature::Translator, || {
        state.providers.translate(request)
    })
    .await?;
    Ok(translation.map(Json))
}

pub async fn speech(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<SpeechRequest>,
) -> ApiResult<Metered<Response>> {
    request.validate()?;
    let audio = metered(&state, &user, Feature::TextToSpeech, || {
        state.providers.text_to_speech(request)
    })
    .await?;
    Ok(audio.map(|audio| ([(CONTENT_TYPE, audio.content_type)], audio.bytes).into_response()))
}

pub async fn seo(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<SeoRequest>,
) -> ApiResult<Metered<Json<serde_json::Value>>> {
    request.validate()?;
    let report = metered(&state, &user, Feature::SeoAnalyzer, || {
        state.providers.seo_audit(request)
    })
    .await?;
    Ok(report.map(Json))
}

pub async fn execute(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Metered<Json<ExecutionResult>>> {
    request.validate()?;
    let result = metered(&state, &user, Feature::CodeRunner, || {
        state.providers.execute_code(request)
    })
    .await?;
    Ok(result.map(Json))
}

pub async fn shorten(
    State(state): AppStateRef,
    AuthUser(user): AuthUser,
    Json(request): Json<ShortenRequest>,
) -> ApiResult<Metered<Json<ShortUrl>>> {
    request.validate()?;
    let short = metered(&state, &user, Feature::UrlShortener, || {
        state.providers.shorten_url(request)
    })
    .await?;
    Ok(short.map(Json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolhubConfig;
    use crate::providers::{Audio, MockToolProviders, ProviderError};
    use crate::server::{generate_token, hash_token, router};
    use crate::store::{Database, MockQuotaStore, QuotaStore, StoreError};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    struct Harness {
        _dir: TempDir,
        db: Arc<Database>,
        app: Router,
        user: UserAccount,
        token: String,
    }

    impl Harness {
        async fn new(
            providers: MockToolProviders,
            configure: impl FnOnce(&mut ToolhubConfig),
        ) -> Self {
            Self::build(providers, configure, None).await
        }

        /// Usage and subscriptions come from `quota_store` instead of the database.
        async fn with_quota_store(
            providers: MockToolProviders,
            quota_store: MockQuotaStore,
        ) -> Self {
            Self::build(providers, |_| {}, Some(Arc::new(quota_store))).await
        }

        async fn build(
            providers: MockToolProviders,
            configure: impl FnOnce(&mut ToolhubConfig),
            quota_store: Option<Arc<dyn QuotaStore>>,
        ) -> Self {
            let dir = tempdir().unwrap();
            let db = Arc::new(Database::open(&dir.path().join("db.sqlite")).await.unwrap());
            let user = db.create_user("tools@example.com", true).await.unwrap();
            let token = generate_token();
            db.insert_access_token(user.id, "test", &hash_token(&token))
                .await
                .unwrap();

            let mut config = ToolhubConfig::default();
            configure(&mut config);
            let quota_store = quota_store.unwrap_or_else(|| db.clone() as Arc<dyn QuotaStore>);
            let state =
                AppState::with_quota_store(db.clone(), quota_store, Arc::new(providers), &config)
                    .unwrap();

            Self {
                _dir: dir,
                db,
                app: router(Arc::new(state)),
                user,
                token,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.app.clone().oneshot(request).await.unwrap()
        }

        fn post(&self, uri: &str, body: Value) -> Request<Body> {
            post_json(uri, Some(&self.token), body)
        }

        fn get(&self, uri: &str) -> Request<Body> {
            Request::builder()
                .uri(uri)
                .header("authorization", format!("Bearer {}", self.token))
                .body(Body::empty())
                .unwrap()
        }

        async fn used(&self, feature: Feature) -> u32 {
            self.db
                .usage(self.user.id)
                .await
                .unwrap()
                .map(|record| record.count(feature))
                .unwrap_or(0)
        }
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn chat_body() -> Value {
        json!({"messages": [{"role": "user", "content": "hello"}]})
    }

    fn header(response: &Response, name: &str) -> String {
        response.headers()[name].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new(MockToolProviders::new(), |_| {}).await;
        let response = harness
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_unknown_token_is_unauthorized() {
        let mut providers = MockToolProviders::new();
        providers.expect_chat().times(0);
        let harness = Harness::new(providers, |_| {}).await;

        let response = harness
            .send(post_json("/api/tools/chat", None, chat_body()))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = harness
            .send(post_json("/api/tools/chat", Some(&generate_token()), chat_body()))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(harness.used(Feature::AiChat).await, 0);
    }

    #[tokio::test]
    async fn test_chat_until_limit_reached() {
        let mut providers = MockToolProviders::new();
        providers.expect_chat().times(2).returning(|_| {
            Ok(ChatReply {
                content: "hi there".to_string(),
                model: "test-model".to_string(),
            })
        });
        let harness = Harness::new(providers, |config| {
            config
                .limits
                .get_mut("ai_chat")
                .unwrap()
                .insert("free".to_string(), 2);
        })
        .await;

        let response = harness.send(harness.post("/api/tools/chat", chat_body())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-quota-limit"), "2");
        assert_eq!(header(&response, "x-quota-remaining"), "1");
        assert_eq!(body_json(response).await["content"], "hi there");

        let response = harness.send(harness.post("/api/tools/chat", chat_body())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-quota-remaining"), "0");

        // Third call is denied without reaching the provider
        let response = harness.send(harness.post("/api/tools/chat", chat_body())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["feature"], "ai_chat");
        assert_eq!(body["tier"], "free");
        assert_eq!(body["limit"], 2);
        assert!(body["error"].as_str().unwrap().contains("Upgrade"));

        assert_eq!(harness.used(Feature::AiChat).await, 2);
    }

    #[tokio::test]
    async fn test_store_failure_during_check_denies_without_calling_provider() {
        let mut providers = MockToolProviders::new();
        providers.expect_chat().times(0);
        let mut store = MockQuotaStore::new();
        store.expect_latest_subscription().returning(|_| Ok(None));
        store
            .expect_usage()
            .returning(|_| Err(StoreError::NotFound("usage table".to_string())));
        store.expect_increment_usage().times(0);
        let harness = Harness::with_quota_store(providers, store).await;

        let response = harness.send(harness.post("/api/tools/chat", chat_body())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().contains("usage table"));

        let response = harness.send(harness.get("/api/usage/ai_chat")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_failed_usage_recording_still_serves_result() {
        let mut providers = MockToolProviders::new();
        providers.expect_chat().times(1).returning(|_| {
            Ok(ChatReply {
                content: "still here".to_string(),
                model: "test-model".to_string(),
            })
        });
        let mut store = MockQuotaStore::new();
        store.expect_latest_subscription().returning(|_| Ok(None));
        store.expect_usage().returning(|_| Ok(None));
        store
            .expect_increment_usage()
            .times(1)
            .returning(|_, _, _| Err(StoreError::NotFound("usage table".to_string())));
        let harness = Harness::with_quota_store(providers, store).await;

        let response = harness.send(harness.post("/api/tools/chat", chat_body())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-quota-limit"), "10");
        assert_eq!(header(&response, "x-quota-remaining"), "9");
        assert_eq!(body_json(response).await["content"], "still here");
    }

    #[tokio::test]
    async fn test_provider_failure_consumes_no_quota() {
        let mut providers = MockToolProviders::new();
        providers.expect_translate().times(1).returning(|_| {
            Err(ProviderError::Status {
                provider: "groq",
                status: 500,
                body: "upstream exploded".to_string(),
            })
        });
        let harness = Harness::new(providers, |_| {}).await;

        let response = harness
            .send(harness.post(
                "/api/tools/translate",
                json!({"text": "hello", "target_language": "French"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(!body["error"].as_str().unwrap().contains("exploded"));

        assert_eq!(harness.used(Feature::Translator).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_gate() {
        let mut providers = MockToolProviders::new();
        providers.expect_detect_ai().times(0);
        providers.expect_shorten_url().times(0);
        let harness = Harness::new(providers, |_| {}).await;

        let response = harness
            .send(harness.post("/api/tools/detect", json!({"text": "   "})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = harness
            .send(harness.post("/api/tools/shorten", json!({"url": "not a url"})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(harness.used(Feature::AiDetector).await, 0);
        assert_eq!(harness.used(Feature::UrlShortener).await, 0);
    }

    #[tokio::test]
    async fn test_speech_returns_audio() {
        let mut providers = MockToolProviders::new();
        providers.expect_text_to_speech().times(1).returning(|_| {
            Ok(Audio {
                content_type: "audio/mpeg".to_string(),
                bytes: vec![0xff, 0xfb, 0x90],
            })
        });
        let harness = Harness::new(providers, |_| {}).await;

        let response = harness
            .send(harness.post("/api/tools/speech", json!({"text": "hello world"})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "content-type"), "audio/mpeg");
        assert_eq!(header(&response, "x-quota-limit"), "3");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), &[0xff, 0xfb, 0x90]);
        assert_eq!(harness.used(Feature::TextToSpeech).await, 1);
    }

    #[tokio::test]
    async fn test_usage_and_me() {
        let harness = Harness::new(MockToolProviders::new(), |_| {}).await;
        harness
            .db
            .increment_usage(harness.user.id, Feature::SeoAnalyzer, Utc::now())
            .await
            .unwrap();

        let response = harness.send(harness.get("/api/usage")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["tier"], "free");
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), Feature::ALL.len());
        let seo = features
            .iter()
            .find(|f| f["feature"] == "seo_analyzer")
            .unwrap();
        assert_eq!(seo["used"], 1);
        assert_eq!(seo["remaining"], 2);

        let response = harness.send(harness.get("/api/me")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "tools@example.com");
        assert_eq!(body["plan"]["tier"], "free");
    }

    #[tokio::test]
    async fn test_feature_usage() {
        let harness = Harness::new(MockToolProviders::new(), |_| {}).await;
        for _ in 0..3 {
            harness
                .db
                .increment_usage(harness.user.id, Feature::TextToSpeech, Utc::now())
                .await
                .unwrap();
        }

        let response = harness.send(harness.get("/api/usage/text_to_speech")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["allowed"], false);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["remaining"], 0);

        let response = harness.send(harness.get("/api/usage/ai-chat")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["remaining"], 10);

        let response = harness.send(harness.get("/api/usage/teleport")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feature_usage_reads_store_once() {
        let mut store = MockQuotaStore::new();
        store
            .expect_latest_subscription()
            .times(1)
            .returning(|_| Ok(None));
        store.expect_usage().times(1).returning(|_| Ok(None));
        let harness = Harness::with_quota_store(MockToolProviders::new(), store).await;

        let response = harness.send(harness.get("/api/usage/seo_analyzer")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["feature"], "seo_analyzer");
        assert_eq!(body["tier"], "free");
        assert_eq!(body["allowed"], true);
        assert_eq!(body["limit"], 3);
        assert_eq!(body["remaining"], 3);
    }

    #[tokio::test]
    async fn test_cron_reset() {
        let harness = Harness::new(MockToolProviders::new(), |config| {
            config.cron_secret = Some("s3cret".to_string());
        })
        .await;
        harness
            .db
            .increment_usage(harness.user.id, Feature::CodeRunner, Utc::now())
            .await
            .unwrap();

        let request = |token: Option<&str>| {
            let mut builder = Request::builder().method("POST").uri("/api/cron/reset-usage");
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            builder.body(Body::empty()).unwrap()
        };

        let response = harness.send(request(None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = harness.send(request(Some("wrong"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(harness.used(Feature::CodeRunner).await, 1);

        let response = harness.send(request(Some("s3cret"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["users_reset"], 1);
        assert_eq!(harness.used(Feature::CodeRunner).await, 0);
    }

    #[tokio::test]
    async fn test_cron_reset_without_secret_is_unavailable() {
        let harness = Harness::new(MockToolProviders::new(), |_| {}).await;
        let response = harness
            .send(
                Request::builder()
                    .uri("/api/cron/reset-usage")
                    .header("authorization", "Bearer anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_convert_needs_no_auth() {
        let harness = Harness::new(MockToolProviders::new(), |_| {}).await;

        let response = harness
            .send(post_json(
                "/api/tools/convert",
                None,
                json!({"value": 100.0, "from": "celsius", "to": "fahrenheit"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"], 212.0);
        assert_eq!(body["category"], "temperature");

        let response = harness
            .send(post_json(
                "/api/tools/convert",
                None,
                json!({"value": 1.0, "from": "kilogram", "to": "meter"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Overflow to infinity would serialize as null
        let response = harness
            .send(post_json(
                "/api/tools/convert",
                None,
                json!({"value": 1e308, "from": "mile", "to": "millimeter"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
