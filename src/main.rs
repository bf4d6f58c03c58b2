//! Toolhub - metered AI and web tools with per-plan daily quotas.

mod cli;
mod commands;
mod config;
mod providers;
mod quota;
mod server;
mod store;
mod tools;
mod types;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Controlled by RUST_LOG, e.g. RUST_LOG=toolhub=debug,tower_http=info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.execute().await
}
