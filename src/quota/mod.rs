//! Per-user, per-feature daily usage quotas.
//!
//! Every metered route follows check -> act -> record:
//! 1. [`Gate::check_access`] decides from the current stored state (no writes)
//! 2. the route performs the external call
//! 3. [`UsageCounter::increment`] records the use, only if the call succeeded
//!
//! Concurrent requests from one user can both pass step 1 before either
//! reaches step 3, so the quota may overshoot slightly under load. Quotas are
//! soft limits, not a security boundary.
//!
//! [`Resetter`] zeroes every counter once a day.

mod counter;
mod error;
mod gate;
mod limits;
mod plan;
mod reset;

pub use counter::UsageCounter;
pub use error::GateError;
pub use gate::{AccessDecision, Gate, UsageSummary};
pub use limits::{LimitError, LimitTable, LimitsConfig};
pub use plan::{PlanCatalog, PlanResolver};
pub use reset::{ResetReport, Resetter};

use std::sync::Arc;

use tracing::warn;

use crate::store::QuotaStore;
use crate::types::{Feature, ResetPolicy, Tier, UserId};

/// The quota subsystem wired to one store.
#[derive(Clone)]
pub struct Quota {
    gate: Gate,
    counter: UsageCounter,
    resetter: Resetter,
}

impl Quota {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        catalog: PlanCatalog,
        limits: LimitTable,
        policy: ResetPolicy,
    ) -> Self {
        let resolver = PlanResolver::new(store.clone(), catalog);
        Self {
            gate: Gate::new(store.clone(), resolver, Arc::new(limits), policy),
            counter: UsageCounter::new(store.clone(), policy),
            resetter: Resetter::new(store),
        }
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn resetter(&self) -> &Resetter {
        &self.resetter
    }

    /// The gate operations bound to one authenticated user.
    pub fn for_user(&self, user_id: UserId) -> UserGate<'_> {
        UserGate {
            quota: self,
            user_id,
        }
    }
}

/// Quota operations for the current user, as used by metered routes.
pub struct UserGate<'a> {
    quota: &'a Quota,
    user_id: UserId,
}

impl UserGate<'_> {
    /// Whether the user has quota left. Store failures deny access.
    pub async fn can_use_feature(&self, feature: Feature) -> bool {
        match self.quota.gate.check_access(self.user_id, feature).await {
            Ok(decision) => decision.allowed,
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    feature = %feature,
                    error = %e,
                    "quota check failed, denying"
                );
                false
            }
        }
    }

    /// Record one use of a feature.
    pub async fn increment_feature_usage(&self, feature: Feature) -> bool {
        self.quota.counter.increment(self.user_id, feature).await
    }

    /// Uses left today. Store failures report zero.
    pub async fn remaining_usage(&self, feature: Feature) -> u32 {
        match self.quota.gate.check_access(self.user_id, feature).await {
            Ok(decision) => decision.remaining,
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    feature = %feature,
                    error = %e,
                    "quota check failed"
                );
                0
            }
        }
    }

    /// Daily limit for the user's tier. `limit_key` is a feature id such as `ai_chat`.
    pub async fn feature_limit(&self, limit_key: &str) -> Result<u32, GateError> {
        let feature: Feature = limit_key
            .parse()
            .map_err(|_| GateError::UnknownLimitKey(limit_key.to_string()))?;
        let tier = self.plan_tier().await;
        Ok(self.quota.gate.limits().get(feature, tier))
    }

    pub async fn plan_tier(&self) -> Tier {
        self.quota.gate.resolver().resolve(self.user_id).await
    }
}
