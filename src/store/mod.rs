//! Relational store for accounts, subscriptions and daily usage counters.
//!
//! Everything lives in one SQLite database:
//! - `users`, `access_tokens` - identities and their bearer tokens
//! - `subscriptions` - plan and status rows written by the payments webhook
//! - `feature_usage` - one row per user, one count column per feature

mod db;
mod error;
mod models;

pub use db::Database;
pub use error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Feature, Subscription, UsageRecord, UserId};

/// Store operations the quota subsystem depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// The user's most recently updated subscription, if any.
    async fn latest_subscription(&self, user_id: UserId)
    -> Result<Option<Subscription>, StoreError>;

    /// The user's counters, or `None` if they have never used a metered feature.
    async fn usage(&self, user_id: UserId) -> Result<Option<UsageRecord>, StoreError>;

    /// Add one to a feature's count, creating the row if needed. Returns the new count.
    async fn increment_usage(
        &self,
        user_id: UserId,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    /// Zero the user's row if it was last reset before `cutoff`. Returns true if it was.
    async fn reset_if_stale(
        &self,
        user_id: UserId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Zero every row in one transaction. Returns the number of rows reset.
    async fn reset_all_usage(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
