//! Daily quota per (feature, tier).
//!
//! The table is built once from configuration and is total afterwards: every
//! feature has a limit for every tier, so lookups at request time cannot fail.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::types::{Feature, Tier};

/// Raw limits as they appear in config: `feature -> tier -> daily limit`.
pub type LimitsConfig = BTreeMap<String, BTreeMap<String, u32>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    #[error("unknown feature in limits: {0}")]
    UnknownFeature(String),

    #[error("unknown tier {tier:?} in limits for {feature}")]
    UnknownTier { feature: String, tier: String },

    #[error("no limit configured for {feature} on the {tier} tier")]
    Missing { feature: Feature, tier: Tier },
}

/// Validated limit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitTable {
    limits: HashMap<(Feature, Tier), u32>,
}

impl LimitTable {
    /// Build and validate a table from config.
    pub fn from_config(config: &LimitsConfig) -> Result<Self, LimitError> {
        let mut limits = HashMap::new();

        for (feature_key, tiers) in config {
            let feature: Feature = feature_key
                .parse()
                .map_err(|_| LimitError::UnknownFeature(feature_key.clone()))?;

            for (tier_key, limit) in tiers {
                let tier: Tier = tier_key.parse().map_err(|_| LimitError::UnknownTier {
                    feature: feature_key.clone(),
                    tier: tier_key.clone(),
                })?;
                limits.insert((feature, tier), *limit);
            }
        }

        for feature in Feature::ALL {
            for tier in Tier::ALL {
                if !limits.contains_key(&(feature, tier)) {
                    return Err(LimitError::Missing { feature, tier });
                }
            }
        }

        Ok(Self { limits })
    }

    /// Built-in limits.
    ///
    /// | Feature        | Free | Pro | Master |
    /// |----------------|------|-----|--------|
    /// | ai_chat        | 10   | 100 | 500    |
    /// | ai_detector    | 5    | 50  | 200    |
    /// | translator     | 10   | 100 | 500    |
    /// | text_to_speech | 3    | 30  | 150    |
    /// | seo_analyzer   | 3    | 30  | 100    |
    /// | code_runner    | 10   | 100 | 500    |
    /// | url_shortener  | 5    | 50  | 250    |
    pub fn default_config() -> LimitsConfig {
        let defaults: [(Feature, [u32; 3]); 7] = [
            (Feature::AiChat, [10, 100, 500]),
            (Feature::AiDetector, [5, 50, 200]),
            (Feature::Translator, [10, 100, 500]),
            (Feature::TextToSpeech, [3, 30, 150]),
            (Feature::SeoAnalyzer, [3, 30, 100]),
            (Feature::CodeRunner, [10, 100, 500]),
            (Feature::UrlShortener, [5, 50, 250]),
        ];

        defaults
            .into_iter()
            .map(|(feature, per_tier)| {
                let tiers = Tier::ALL
                    .iter()
                    .zip(per_tier)
                    .map(|(tier, limit)| (tier.as_str().to_string(), limit))
                    .collect();
                (feature.as_str().to_string(), tiers)
            })
            .collect()
    }

    /// Daily limit for a feature on a tier.
    pub fn get(&self, feature: Feature, tier: Tier) -> u32 {
        self.limits.get(&(feature, tier)).copied().unwrap_or(0)
    }
}

impl Default for LimitTable {
    fn default() -> Self {
        let limits = Self::default_config()
            .into_iter()
            .flat_map(|(feature, tiers)| {
                tiers.into_iter().filter_map(move |(tier, limit)| {
                    Some(((feature.parse().ok()?, tier.parse().ok()?), limit))
                })
            })
            .collect();
        Self { limits }
    }
}
