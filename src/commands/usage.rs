//! Usage command - show a user's quota standing.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::Args;

use crate::config::ToolhubConfig;
use crate::quota::Quota;
use crate::types::Feature;

use super::{open_database, require_user};

#[derive(Args)]
pub struct UsageCmd {
    /// Account email
    pub email: String,

    /// Show a single feature (e.g. ai_chat) instead of the full table
    #[arg(long)]
    pub feature: Option<String>,
}

impl UsageCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = ToolhubConfig::load(config_path)?;
        let db = Arc::new(open_database(&config).await?);
        let user = require_user(&db, &self.email).await?;

        let quota = Quota::new(
            db,
            config.plan_catalog(),
            config.limit_table()?,
            config.reset_policy,
        );

        if let Some(key) = &self.feature {
            let gate = quota.for_user(user.id);
            let limit = gate.feature_limit(key).await?;
            let feature: Feature = key.parse().map_err(|e: String| anyhow!(e))?;

            println!("User:        {}", user.email);
            println!("Tier:        {}", gate.plan_tier().await);
            println!("Feature:     {}", feature.display_name());
            println!("Limit:       {}", limit);
            println!("Remaining:   {}", gate.remaining_usage(feature).await);
            println!(
                "Allowed:     {}",
                if gate.can_use_feature(feature).await { "yes" } else { "no" }
            );
            return Ok(());
        }

        let summary = quota.gate().summary_at(user.id, Utc::now()).await?;

        println!("User:        {}", user.email);
        println!("Tier:        {}", summary.tier);
        println!(
            "Last reset:  {}",
            summary
                .last_reset
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string())
        );
        println!();
        println!("{:<16} {:>6} {:>6} {:>10}", "FEATURE", "USED", "LIMIT", "REMAINING");
        for decision in &summary.features {
            println!(
                "{:<16} {:>6} {:>6} {:>10}",
                decision.feature.as_str(),
                decision.used,
                decision.limit,
                decision.remaining
            );
        }

        Ok(())
    }
}
