//! Plan resolution: authenticated user -> tier.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::QuotaStore;
use crate::types::{ResolvedPlan, Subscription, Tier, UserId};

/// Maps payment-provider plan identifiers to tiers.
///
/// Loaded from the `[plans]` config table so pricing changes don't need a deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanCatalog {
    plans: BTreeMap<String, Tier>,
}

impl PlanCatalog {
    pub fn new(plans: BTreeMap<String, Tier>) -> Self {
        Self { plans }
    }

    pub fn tier_for(&self, plan_id: &str) -> Option<Tier> {
        self.plans.get(plan_id).copied()
    }

    /// Tier granted by a subscription: its plan's tier if entitled, Free otherwise.
    pub fn tier_of(&self, subscription: &Subscription) -> Tier {
        if !subscription.status.is_entitled() {
            return Tier::Free;
        }

        match self.tier_for(&subscription.plan_id) {
            Some(tier) => tier,
            None => {
                warn!(
                    plan_id = %subscription.plan_id,
                    user_id = %subscription.user_id,
                    "subscription references unknown plan, treating as free"
                );
                Tier::Free
            }
        }
    }
}

/// Resolves a user's current tier. Never fails: any problem resolves to Free.
#[derive(Clone)]
pub struct PlanResolver {
    store: Arc<dyn QuotaStore>,
    catalog: PlanCatalog,
}

impl PlanResolver {
    pub fn new(store: Arc<dyn QuotaStore>, catalog: PlanCatalog) -> Self {
        Self { store, catalog }
    }

    pub async fn resolve(&self, user_id: UserId) -> Tier {
        self.resolve_plan(user_id).await.tier
    }

    /// Tier together with the subscription it was derived from.
    pub async fn resolve_plan(&self, user_id: UserId) -> ResolvedPlan {
        let subscription = match self.store.latest_subscription(user_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "subscription lookup failed, treating as free"
                );
                None
            }
        };

        let tier = subscription
            .as_ref()
            .map(|s| self.catalog.tier_of(s))
            .unwrap_or(Tier::Free);

        debug!(user_id = %user_id, tier = %tier, "resolved plan");

        ResolvedPlan { tier, subscription }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockQuotaStore, StoreError};
    use crate::types::SubscriptionStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn catalog() -> PlanCatalog {
        PlanCatalog::new(BTreeMap::from([
            ("price_pro_monthly".to_string(), Tier::Pro),
            ("price_master_yearly".to_string(), Tier::Master),
        ]))
    }

    fn subscription(user_id: UserId, plan_id: &str, status: SubscriptionStatus) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan_id.to_string(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn resolver_returning(
        result: impl Fn(UserId) -> Result<Option<Subscription>, StoreError> + Send + 'static,
    ) -> PlanResolver {
        let mut store = MockQuotaStore::new();
        store.expect_latest_subscription().returning(result);
        PlanResolver::new(Arc::new(store), catalog())
    }

    #[tokio::test]
    async fn test_no_subscription_is_free() {
        let resolver = resolver_returning(|_| Ok(None));
        assert_eq!(resolver.resolve(Uuid::new_v4()).await, Tier::Free);
    }

    #[tokio::test]
    async fn test_entitled_subscription_maps_plan() {
        let resolver = resolver_returning(|user| {
            Ok(Some(subscription(
                user,
                "price_master_yearly",
                SubscriptionStatus::Trialing,
            )))
        });
        assert_eq!(resolver.resolve(Uuid::new_v4()).await, Tier::Master);
    }

    #[tokio::test]
    async fn test_past_due_subscription_is_free() {
        let resolver = resolver_returning(|user| {
            Ok(Some(subscription(
                user,
                "price_pro_monthly",
                SubscriptionStatus::PastDue,
            )))
        });
        let plan = resolver.resolve_plan(Uuid::new_v4()).await;
        assert_eq!(plan.tier, Tier::Free);
        assert!(plan.subscription.is_some());
    }

    #[tokio::test]
    async fn test_unknown_plan_is_free() {
        let resolver = resolver_returning(|user| {
            Ok(Some(subscription(user, "price_legacy", SubscriptionStatus::Active)))
        });
        assert_eq!(resolver.resolve(Uuid::new_v4()).await, Tier::Free);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_free() {
        let resolver =
            resolver_returning(|_| Err(StoreError::Corrupt("bad status".to_string())));
        assert_eq!(resolver.resolve(Uuid::new_v4()).await, Tier::Free);
    }
}
