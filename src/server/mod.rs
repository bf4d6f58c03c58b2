//! HTTP API.
//!
//! Routes:
//! - `POST /api/tools/{chat,detect,translate,speech,seo,execute,shorten}`: metered tools
//! - `POST /api/tools/convert`: unit converter (no auth, no quota)
//! - `GET /api/usage`, `GET /api/usage/:feature`, `GET /api/me`: the caller's standing and account
//! - `GET|POST /api/cron/reset-usage`: daily reset, guarded by the cron secret
//! - `GET /health`

mod auth;
mod error;
mod metered;
mod routes;

pub use auth::{generate_token, hash_token};

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use secrecy::SecretString;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ToolhubConfig;
use crate::providers::{HttpProviders, ToolProviders};
use crate::quota::Quota;
use crate::store::{Database, QuotaStore};

/// Shared by every request.
pub struct AppState {
    pub db: Arc<Database>,
    pub quota: Quota,
    pub providers: Arc<dyn ToolProviders>,
    pub cron_secret: Option<SecretString>,
}

impl AppState {
    /// Validates the limit table; an incomplete table is a startup error.
    pub fn new(
        db: Arc<Database>,
        providers: Arc<dyn ToolProviders>,
        config: &ToolhubConfig,
    ) -> Result<Self> {
        Self::with_quota_store(db.clone(), db, providers, config)
    }

    /// Like [`AppState::new`], with usage and subscriptions read through `quota_store`.
    /// Accounts and tokens still come from `db`.
    pub fn with_quota_store(
        db: Arc<Database>,
        quota_store: Arc<dyn QuotaStore>,
        providers: Arc<dyn ToolProviders>,
        config: &ToolhubConfig,
    ) -> Result<Self> {
        let quota = Quota::new(
            quota_store,
            config.plan_catalog(),
            config.limit_table()?,
            config.reset_policy,
        );

        Ok(Self {
            db,
            quota,
            providers,
            cron_secret: config.cron_secret(),
        })
    }

    /// Open the database and build the production provider clients.
    pub async fn from_config(config: &ToolhubConfig) -> Result<Self> {
        // Fail on a bad limit table before touching the database
        config.limit_table()?;

        let db = Database::open(&config.database_path)
            .await
            .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
        let providers =
            HttpProviders::new(&config.providers).context("Failed to build provider clients")?;

        Self::new(Arc::new(db), Arc::new(providers), config)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/me", get(routes::me))
        .route("/api/usage", get(routes::usage))
        .route("/api/usage/:feature", get(routes::feature_usage))
        .route(
            "/api/cron/reset-usage",
            get(routes::reset_usage).post(routes::reset_usage),
        )
        .route("/api/tools/convert", post(routes::convert))
        .route("/api/tools/chat", post(routes::chat))
        .route("/api/tools/detect", post(routes::detect))
        .route("/api/tools/translate", post(routes::translate))
        .route("/api/tools/speech", post(routes::speech))
        .route("/api/tools/seo", post(routes::seo))
        .route("/api/tools/execute", post(routes::execute))
        .route("/api/tools/shorten", post(routes::shorten))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
