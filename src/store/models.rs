//! Row models and conversions for the SQLite store.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{Subscription, UserAccount};

use super::error::StoreError;

// ============================================================================
// Timestamps
// ============================================================================

/// Fixed-width RFC 3339 text so timestamps compare correctly as strings in SQL.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", value, e)))
}

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("bad id {:?}: {}", value, e)))
}

// ============================================================================
// Users
// ============================================================================

/// A user row.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub created_at: String,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            id: parse_uuid(&row.id)?,
            email: row.email,
            email_verified: row.email_verified,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// A subscription row.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            plan_id: row.plan_id,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}
