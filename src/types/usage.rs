use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Feature, UserId};

/// One user's daily counters.
///
/// All features share a single `last_reset`; the whole row is reset at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: UserId,
    pub counts: BTreeMap<Feature, u32>,
    pub last_reset: DateTime<Utc>,
}

impl UsageRecord {
    /// A record with every count at zero.
    pub fn empty(user_id: UserId, last_reset: DateTime<Utc>) -> Self {
        Self {
            user_id,
            counts: Feature::ALL.iter().map(|f| (*f, 0)).collect(),
            last_reset,
        }
    }

    pub fn count(&self, feature: Feature) -> u32 {
        self.counts.get(&feature).copied().unwrap_or(0)
    }

    /// True when the counters were last reset before the current UTC day.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.last_reset < start_of_day(now)
    }
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

/// When counters are considered expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Counts persist until the scheduled resetter zeroes them.
    #[default]
    Scheduled,
    /// Counts from a previous UTC day read as zero and are cleared on the next increment.
    Lazy,
}

impl std::fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetPolicy::Scheduled => write!(f, "scheduled"),
            ResetPolicy::Lazy => write!(f, "lazy"),
        }
    }
}
