//! User command - create accounts and issue access tokens.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ToolhubConfig;
use crate::server::{generate_token, hash_token};

use super::{open_database, require_user};

#[derive(Args)]
pub struct UserCmd {
    #[command(subcommand)]
    pub command: UserSubCmd,
}

#[derive(Subcommand)]
pub enum UserSubCmd {
    /// Create an account
    Create(CreateUserCmd),

    /// Issue a bearer access token for an account
    Token(TokenCmd),
}

#[derive(Args)]
pub struct CreateUserCmd {
    pub email: String,

    /// Mark the email as verified
    #[arg(long)]
    pub verified: bool,
}

#[derive(Args)]
pub struct TokenCmd {
    pub email: String,

    /// Label for the token (e.g., "website", "cli")
    #[arg(long, default_value = "cli")]
    pub name: String,
}

impl UserCmd {
    pub async fn run(&self, config_path: Option<&Path>) -> Result<()> {
        let config = ToolhubConfig::load(config_path)?;
        let db = open_database(&config).await?;

        match &self.command {
            UserSubCmd::Create(cmd) => {
                let user = db.create_user(&cmd.email, cmd.verified).await?;
                println!("Created user {} ({})", user.email, user.id);
            }
            UserSubCmd::Token(cmd) => {
                let user = require_user(&db, &cmd.email).await?;
                let token = generate_token();
                db.insert_access_token(user.id, &cmd.name, &hash_token(&token))
                    .await?;

                println!("Token for {} ({}):", user.email, cmd.name);
                println!();
                println!("  {}", token);
                println!();
                println!("It will not be shown again.");
            }
        }
        Ok(())
    }
}
