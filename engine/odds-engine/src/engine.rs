use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{BookmakerQuote, Match, OutcomeSlot, ResolvedMarket, SlotPrices, SyntheticTiers};
use crate::matcher::resolve_quote;
use crate::ranker::{dedupe_by_title, order, visible};
use crate::resolver::{resolve, ResolvedOdds};
use crate::tiers::{compute_tiers, find_secondary, tier_quote};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One displayed row: a real bookmaker or a synthetic tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub key: String,
    pub title: String,
    pub prices: SlotPrices,
    pub synthetic: bool,
}

/// Everything the engine derives for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub match_key: String,
    pub slots: Vec<OutcomeSlot>,
    pub resolved: ResolvedOdds,
    pub market: ResolvedMarket,
    pub tiers: SyntheticTiers,

    /// Tier rows and deduplicated bookmaker rows in display order
    pub rows: Vec<PriceRow>,
}

impl MatchOdds {
    /// Rows shown for the match, the first `limit` unless expanded
    pub fn visible_rows(&self, limit: usize, expanded: bool) -> &[PriceRow] {
        visible(&self.rows, limit, expanded)
    }

    /// Rows hidden behind the expand control
    pub fn hidden_rows(&self, limit: usize) -> usize {
        self.rows.len().saturating_sub(limit)
    }
}

/// Pricing pipeline: dedupe, resolve outcomes, select the market best,
/// derive synthetic tiers and rank the display rows.
pub struct OddsEngine {
    config: EngineConfig,
    excluded: Vec<String>,
}

impl OddsEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let excluded = config.excluded_keys();
        Ok(Self { config, excluded })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one match against the secondary feed's records.
    ///
    /// `sort` selects an outcome column to order bookmaker rows by; `None`
    /// orders by total payout.
    pub fn evaluate(&self, m: &Match, secondary: &[Match], sort: Option<OutcomeSlot>) -> MatchOdds {
        // Tier keys are engine-owned; a source sending one is ignored
        let tier_keys = self.config.tier_keys();
        let sourced: Vec<BookmakerQuote> = m
            .quotes
            .iter()
            .filter(|quote| !tier_keys.contains(&quote.key.as_str()))
            .cloned()
            .collect();
        let deduped = Match {
            quotes: dedupe_by_title(&sourced, m),
            ..m.clone()
        };

        let resolved = resolve(&deduped, &self.config);
        let market = ResolvedMarket::from_resolved(&resolved, &self.excluded);
        let tiers = compute_tiers(
            &deduped,
            &resolved,
            &market,
            find_secondary(m, secondary),
            &self.excluded,
            self.config.boost_multiplier,
        );

        let mut candidates: Vec<BookmakerQuote> = tiers
            .iter()
            .filter(|tier| !tier.prices.is_empty())
            .map(|tier| tier_quote(tier, m, &self.config.tiers))
            .collect();
        // Sourced quotes are already deduplicated; tier rows may share a title with them
        candidates.extend(deduped.quotes.iter().cloned());

        let rows = order(&candidates, m, sort, &self.config.priority_keys)
            .into_iter()
            .map(|quote| PriceRow {
                prices: resolve_quote(&quote, m).restricted_to(&resolved.slots),
                synthetic: tier_keys.contains(&quote.key.as_str()),
                key: quote.key,
                title: quote.title,
            })
            .collect();

        debug!(
            "Evaluated {}: {} quotes, {} market slots",
            m.key(),
            deduped.quotes.len(),
            market.prices.len()
        );

        MatchOdds {
            match_key: m.key(),
            slots: resolved.slots.clone(),
            resolved,
            market,
            tiers,
            rows,
        }
    }

    /// Evaluate a whole snapshot
    pub fn evaluate_all(&self, matches: &[Match], secondary: &[Match], sort: Option<OutcomeSlot>) -> Vec<MatchOdds> {
        let evaluated: Vec<MatchOdds> = matches.iter().map(|m| self.evaluate(m, secondary, sort)).collect();
        info!("Evaluated odds for {} matches", evaluated.len());
        evaluated
    }
}
