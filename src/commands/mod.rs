//! CLI command implementations.

mod config;
mod convert;
mod reset;
mod serve;
mod subscription;
mod usage;
mod user;

pub use config::ConfigCmd;
pub use convert::ConvertCmd;
pub use reset::ResetCmd;
pub use serve::ServeCmd;
pub use subscription::SubscriptionCmd;
pub use usage::UsageCmd;
pub use user::UserCmd;

use anyhow::{Context, Result};

use crate::config::ToolhubConfig;
use crate::store::Database;
use crate::types::UserAccount;

async fn open_database(config: &ToolhubConfig) -> Result<Database> {
    Database::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))
}

async fn require_user(db: &Database, email: &str) -> Result<UserAccount> {
    db.find_user_by_email(email)
        .await?
        .with_context(|| format!("No user with email {}", email))
}
