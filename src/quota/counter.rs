//! Recording usage after a gated action succeeds.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::store::QuotaStore;
use crate::types::{Feature, ResetPolicy, UserId, start_of_day};

/// Increments daily counters.
///
/// Call only after the external action completed: a failed action must not
/// consume quota. A failed increment is logged and reported as `false`; the
/// action already happened, so the count is simply under-reported.
#[derive(Clone)]
pub struct UsageCounter {
    store: Arc<dyn QuotaStore>,
    policy: ResetPolicy,
}

impl UsageCounter {
    pub fn new(store: Arc<dyn QuotaStore>, policy: ResetPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn increment(&self, user_id: UserId, feature: Feature) -> bool {
        self.increment_at(user_id, feature, Utc::now()).await
    }

    pub async fn increment_at(
        &self,
        user_id: UserId,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> bool {
        if self.policy == ResetPolicy::Lazy {
            match self.store.reset_if_stale(user_id, start_of_day(now), now).await {
                Ok(true) => debug!(user_id = %user_id, "cleared stale counters"),
                Ok(false) => {}
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "failed to clear stale counters");
                    return false;
                }
            }
        }

        match self.store.increment_usage(user_id, feature, now).await {
            Ok(count) => {
                debug!(user_id = %user_id, feature = %feature, count, "recorded usage");
                true
            }
            Err(e) => {
                warn!(user_id = %user_id, feature = %feature, error = %e, "failed to record usage");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockQuotaStore, StoreError};
    use mockall::predicate::eq;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_increment_success() {
        let user = Uuid::new_v4();
        let mut store = MockQuotaStore::new();
        store
            .expect_increment_usage()
            .withf(move |u, f, _| *u == user && *f == Feature::CodeRunner)
            .times(1)
            .returning(|_, _, _| Ok(3));
        store.expect_reset_if_stale().times(0);

        let counter = UsageCounter::new(Arc::new(store), ResetPolicy::Scheduled);
        assert!(counter.increment(user, Feature::CodeRunner).await);
    }

    #[tokio::test]
    async fn test_increment_failure_reports_false() {
        let mut store = MockQuotaStore::new();
        store
            .expect_increment_usage()
            .returning(|_, _, _| Err(StoreError::NotFound("feature_usage".to_string())));

        let counter = UsageCounter::new(Arc::new(store), ResetPolicy::Scheduled);
        assert!(!counter.increment(Uuid::new_v4(), Feature::AiChat).await);
    }

    #[tokio::test]
    async fn test_lazy_policy_clears_stale_row_first() {
        let now = Utc::now();
        let mut seq = mockall::Sequence::new();
        let mut store = MockQuotaStore::new();
        store
            .expect_reset_if_stale()
            .with(mockall::predicate::always(), eq(start_of_day(now)), eq(now))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(true));
        store
            .expect_increment_usage()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(1));

        let counter = UsageCounter::new(Arc::new(store), ResetPolicy::Lazy);
        assert!(counter.increment_at(Uuid::new_v4(), Feature::Translator, now).await);
    }
}
