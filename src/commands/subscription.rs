//! Subscription command - record and inspect subscription state.
//!
//! Normally written by the payments webhook; this is the manual override.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ToolhubConfig;
use crate::types::SubscriptionStatus;

use super::{open_database, require_user};

#[derive(Args)]
pub struct SubscriptionCmd {
    #[command(subcommand)]
    pub command: SubscriptionSubCmd,
}

#[derive(Subcommand)]
pub enum SubscriptionSubCmd {
    /// Record a subscription state (becomes the user's current subscription)
    Set(SetSubscriptionCmd),

    /// Show subscription history and the resolved tier
    Show(ShowSubscriptionCmd),
}

#[derive(Args)]
pub struct SetSubscriptionCmd {
    pub email: String,

    /// Plan id from the payments provider (see [plans] in the config)
    pub plan_id: String,

    #[arg(long, value_enum, default_value_t = SubscriptionStatus::Active)]
    pub status: SubscriptionStatus,
}

#[derive(Args)]
pub struct ShowSubscriptionCmd {
    pub email: String,
}

impl SubscriptionCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = ToolhubConfig::load(config_path)?;
        let catalog = config.plan_catalog();
        let db = open_database(&config).await?;

        match &self.command {
            SubscriptionSubCmd::Set(cmd) => {
                let user = require_user(&db, &cmd.email).await?;
                if catalog.tier_for(&cmd.plan_id).is_none() {
                    eprintln!(
                        "Warning: plan '{}' is not in [plans]; it will resolve to free",
                        cmd.plan_id
                    );
                }

                let subscription = db
                    .record_subscription(user.id, &cmd.plan_id, cmd.status)
                    .await?;
                println!(
                    "{}: {} ({}) -> {}",
                    user.email,
                    subscription.plan_id,
                    subscription.status,
                    catalog.tier_of(&subscription)
                );
            }
            SubscriptionSubCmd::Show(cmd) => {
                let user = require_user(&db, &cmd.email).await?;
                let subscriptions = db.list_subscriptions(user.id).await?;

                let tier = subscriptions
                    .first()
                    .map(|s| catalog.tier_of(s))
                    .unwrap_or_default();
                println!("{}: {}", user.email, tier);

                if subscriptions.is_empty() {
                    println!("No subscriptions.");
                    return Ok(());
                }

                println!();
                for s in &subscriptions {
                    println!(
                        "  {}  {:<20} {:<10} {}",
                        s.updated_at.format("%Y-%m-%d %H:%M:%S"),
                        s.plan_id,
                        s.status.as_str(),
                        catalog.tier_of(s)
                    );
                }
            }
        }
        Ok(())
    }
}
