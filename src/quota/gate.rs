//! The access decision for metered features.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::store::QuotaStore;
use crate::types::{Feature, ResetPolicy, Tier, UsageRecord, UserId};

use super::error::GateError;
use super::limits::LimitTable;
use super::plan::PlanResolver;

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub feature: Feature,
    pub tier: Tier,
    pub allowed: bool,
    pub used: u32,
    pub limit: u32,
    /// `limit - used`, clamped at zero
    pub remaining: u32,
}

impl AccessDecision {
    pub fn new(feature: Feature, tier: Tier, used: u32, limit: u32) -> Self {
        let remaining = limit.saturating_sub(used);
        Self {
            feature,
            tier,
            allowed: remaining > 0,
            used,
            limit,
            remaining,
        }
    }
}

/// Read-only policy check: tier + limit + current count -> allow/deny.
///
/// The gate never writes; recording usage is [`super::UsageCounter`]'s job.
#[derive(Clone)]
pub struct Gate {
    store: Arc<dyn QuotaStore>,
    resolver: PlanResolver,
    limits: Arc<LimitTable>,
    policy: ResetPolicy,
}

impl Gate {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        resolver: PlanResolver,
        limits: Arc<LimitTable>,
        policy: ResetPolicy,
    ) -> Self {
        Self {
            store,
            resolver,
            limits,
            policy,
        }
    }

    pub async fn check_access(
        &self,
        user_id: UserId,
        feature: Feature,
    ) -> Result<AccessDecision, GateError> {
        self.check_access_at(user_id, feature, Utc::now()).await
    }

    pub async fn check_access_at(
        &self,
        user_id: UserId,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<AccessDecision, GateError> {
        let tier = self.resolver.resolve(user_id).await;
        let limit = self.limits.get(feature, tier);
        let record = self.store.usage(user_id).await?;
        let used = self.effective_count(record.as_ref(), feature, now);

        let decision = AccessDecision::new(feature, tier, used, limit);
        debug!(
            user_id = %user_id,
            feature = %feature,
            tier = %tier,
            used,
            limit,
            allowed = decision.allowed,
            "quota check"
        );

        Ok(decision)
    }

    /// Decisions for every feature from a single usage read.
    pub async fn summary_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<UsageSummary, GateError> {
        let tier = self.resolver.resolve(user_id).await;
        let record = self.store.usage(user_id).await?;

        let features = Feature::ALL
            .iter()
            .map(|feature| {
                let used = self.effective_count(record.as_ref(), *feature, now);
                AccessDecision::new(*feature, tier, used, self.limits.get(*feature, tier))
            })
            .collect();

        Ok(UsageSummary {
            tier,
            last_reset: record.map(|r| r.last_reset),
            features,
        })
    }

    fn effective_count(
        &self,
        record: Option<&UsageRecord>,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> u32 {
        match record {
            None => 0,
            Some(record) if self.policy == ResetPolicy::Lazy && record.is_stale(now) => 0,
            Some(record) => record.count(feature),
        }
    }

    pub fn resolver(&self) -> &PlanResolver {
        &self.resolver
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }
}

/// Every feature's standing for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub tier: Tier,
    pub last_reset: Option<DateTime<Utc>>,
    pub features: Vec<AccessDecision>,
}
