//! Serve command - run the HTTP API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::config::ToolhubConfig;
use crate::server::{self, AppState};

#[derive(Args)]
pub struct ServeCmd {
    /// Address to listen on (overrides bind_addr)
    #[arg(long, env = "TOOLHUB_BIND")]
    pub bind: Option<String>,

    /// SQLite database file (overrides database_path)
    #[arg(long, env = "TOOLHUB_DATABASE")]
    pub database: Option<PathBuf>,
}

impl ServeCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let mut config = ToolhubConfig::load(config_path)?;
        if let Some(bind) = &self.bind {
            config.bind_addr = bind.clone();
        }
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }

        if config.cron_secret().is_none() {
            info!("no cron_secret configured; /api/cron/reset-usage is disabled");
        }

        let state = AppState::from_config(&config).await?;
        info!(
            database = %config.database_path.display(),
            reset_policy = %config.reset_policy,
            "starting server"
        );

        server::serve(Arc::new(state), &config.bind_addr).await
    }
}
