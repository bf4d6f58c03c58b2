//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{
    ConfigCmd, ConvertCmd, ResetCmd, ServeCmd, SubscriptionCmd, UsageCmd, UserCmd,
};

#[derive(Parser)]
#[command(name = "toolhub")]
#[command(about = "Toolhub - metered AI and web tools with daily plan quotas")]
#[command(version)]
pub struct Cli {
    /// Config file (default: ~/.config/toolhub/config.toml)
    #[arg(long, global = true, env = "TOOLHUB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeCmd),

    /// Zero every user's usage counters now
    Reset(ResetCmd),

    /// Show a user's usage, limits and tier
    Usage(UsageCmd),

    /// Create users and issue access tokens
    User(UserCmd),

    /// Record or inspect subscription state
    Subscription(SubscriptionCmd),

    /// Convert a value between units
    Convert(ConvertCmd),

    /// Manage configuration (plans, limits, secrets)
    Config(ConfigCmd),
}

impl Cli {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = self.config.as_deref();
        match &self.command {
            Command::Serve(cmd) => cmd.run(config).await,
            Command::Reset(cmd) => cmd.run(config).await,
            Command::Usage(cmd) => cmd.run(config).await,
            Command::User(cmd) => cmd.run(config).await,
            Command::Subscription(cmd) => cmd.run(config).await,
            Command::Convert(cmd) => cmd.run().await,
            Command::Config(cmd) => cmd.run(config).await,
        }
    }
}
