use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SubscriptionStatus, Tier};

pub type UserId = Uuid;

/// An account issued by the auth layer. Never mutated by the quota subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The subscription record a user's tier is derived from.
///
/// Written by the payments webhook; read-only for the quota gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: UserId,
    /// Payment-provider plan/price identifier, mapped to a tier by the plan catalog
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The tier a user resolved to, plus the subscription it came from (if any).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlan {
    pub tier: Tier,
    pub subscription: Option<Subscription>,
}
