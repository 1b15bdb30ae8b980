use crate::error::{EngineError, Result};
use crate::models::TierKind;
use crate::ranker::DEFAULT_VISIBLE_QUOTES;
use crate::resolver::DEFAULT_MIN_DRAW_PROBABILITY;
use serde::{Deserialize, Serialize};

/// Default multiplier applied by the Boost and SuperBoost tiers
pub const DEFAULT_BOOST_MULTIPLIER: f64 = 1.05;

/// Configuration for the odds engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bookmaker key of our own platform. Never counted towards the market best.
    pub platform_key: String,

    /// Source keys pinned ahead of price ordering, in display order
    pub priority_keys: Vec<String>,

    /// Multiplier used by Boost and SuperBoost (e.g., 1.05 = +5%)
    pub boost_multiplier: f64,

    /// Floor for the implied draw probability before inversion
    pub min_draw_probability: f64,

    /// Number of quote rows shown before the list is expanded
    pub visible_quotes: usize,

    /// Keys and titles of the synthetic tier rows
    pub tiers: TierRowConfig,

    /// Logo lookup cache
    pub logo_cache: CacheConfig,
}

/// TTL cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRowConfig {
    pub standard_key: String,
    pub standard_title: String,
    pub boost_key: String,
    pub boost_title: String,
    pub super_boost_key: String,
    pub super_boost_title: String,
}

impl Default for TierRowConfig {
    fn default() -> Self {
        Self {
            standard_key: "funbet_standard".to_string(),
            standard_title: "FunBet".to_string(),
            boost_key: "funbet_boost".to_string(),
            boost_title: "FunBet Boost".to_string(),
            super_boost_key: "funbet_superboost".to_string(),
            super_boost_title: "FunBet SuperBoost".to_string(),
        }
    }
}

impl TierRowConfig {
    /// Row key for a tier
    pub fn key(&self, kind: TierKind) -> &str {
        match kind {
            TierKind::Standard => &self.standard_key,
            TierKind::Boost => &self.boost_key,
            TierKind::SuperBoost => &self.super_boost_key,
        }
    }

    /// Row title for a tier
    pub fn title(&self, kind: TierKind) -> &str {
        match kind {
            TierKind::Standard => &self.standard_title,
            TierKind::Boost => &self.boost_title,
            TierKind::SuperBoost => &self.super_boost_title,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let tiers = TierRowConfig::default();
        let priority_keys = vec![
            tiers.super_boost_key.clone(),
            tiers.boost_key.clone(),
            tiers.standard_key.clone(),
            "bet365".to_string(),
            "williamhill".to_string(),
            "paddypower".to_string(),
            "skybet".to_string(),
            "betfair_ex_uk".to_string(),
        ];

        Self {
            platform_key: "funbet".to_string(),
            priority_keys,
            boost_multiplier: DEFAULT_BOOST_MULTIPLIER,
            min_draw_probability: DEFAULT_MIN_DRAW_PROBABILITY,
            visible_quotes: DEFAULT_VISIBLE_QUOTES,
            tiers,
            logo_cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Row keys of the synthetic tiers
    pub fn tier_keys(&self) -> [&str; 3] {
        [
            &self.tiers.super_boost_key,
            &self.tiers.boost_key,
            &self.tiers.standard_key,
        ]
    }

    /// Keys whose prices never feed the market best: the platform itself and
    /// every synthetic tier row.
    pub fn excluded_keys(&self) -> Vec<String> {
        std::iter::once(self.platform_key.as_str())
            .chain(self.tier_keys())
            .map(str::to_string)
            .collect()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.boost_multiplier.is_finite() || self.boost_multiplier <= 0.0 {
            return Err(EngineError::config(format!(
                "boost_multiplier must be positive, got {}",
                self.boost_multiplier
            )));
        }

        if !(self.min_draw_probability > 0.0 && self.min_draw_probability < 1.0) {
            return Err(EngineError::config(format!(
                "min_draw_probability must lie in (0, 1), got {}",
                self.min_draw_probability
            )));
        }

        let tier_keys = [
            &self.tiers.standard_key,
            &self.tiers.boost_key,
            &self.tiers.super_boost_key,
        ];
        if tier_keys.iter().any(|key| key.trim().is_empty()) {
            return Err(EngineError::config("tier row keys must not be empty"));
        }
        if tier_keys.iter().any(|key| **key == self.platform_key) {
            return Err(EngineError::config("tier row keys must differ from the platform key"));
        }

        if self.logo_cache.max_size == 0 {
            return Err(EngineError::config("logo_cache.max_size must be at least 1"));
        }

        Ok(())
    }
}
