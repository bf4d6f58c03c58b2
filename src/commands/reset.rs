//! Reset command - zero every usage counter now.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::ToolhubConfig;
use crate::quota::Resetter;

use super::open_database;

#[derive(Args)]
pub struct ResetCmd;

impl ResetCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = ToolhubConfig::load(config_path)?;
        let db = open_database(&config).await?;

        let report = Resetter::new(Arc::new(db))
            .run()
            .await
            .context("Usage reset failed; no counters were changed")?;

        println!(
            "Reset usage for {} user(s) at {}",
            report.users_reset,
            report.reset_at.to_rfc3339()
        );
        Ok(())
    }
}
