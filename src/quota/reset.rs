//! Daily bulk reset of every usage counter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::store::{QuotaStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub users_reset: u64,
    pub reset_at: DateTime<Utc>,
}

/// Zeroes all counters in one transaction. A failure leaves every count untouched.
#[derive(Clone)]
pub struct Resetter {
    store: Arc<dyn QuotaStore>,
}

impl Resetter {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self) -> Result<ResetReport, StoreError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ResetReport, StoreError> {
        match self.store.reset_all_usage(now).await {
            Ok(users_reset) => {
                info!(users_reset, reset_at = %now, "usage counters reset");
                Ok(ResetReport {
                    users_reset,
                    reset_at: now,
                })
            }
            Err(e) => {
                error!(error = %e, "usage reset aborted");
                Err(e)
            }
        }
    }
}
