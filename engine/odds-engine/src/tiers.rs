//! Synthetic pricing tiers
//!
//! Three rows are derived on top of the observed market:
//!
//! - **SuperBoost**: every best market price lifted by the boost multiplier.
//! - **Standard**: the secondary feed's price for the same fixture, otherwise
//!   the mean of all primary-feed bookmaker prices for the slot.
//! - **Boost**: Standard with the favorite (lowest) and underdog (highest)
//!   lifted by the multiplier; the remaining slot is copied unchanged.

use crate::config::TierRowConfig;
use crate::matcher::{resolve_quote, same_fixture};
use crate::models::{
    round2, BookmakerQuote, Match, OutcomePrice, OutcomeSlot, ResolvedMarket, SlotPrices,
    SyntheticTier, SyntheticTiers, TierKind,
};
use crate::resolver::ResolvedOdds;
use tracing::debug;

/// SuperBoost: `round2(best × multiplier)` for every slot with a best price
pub fn super_boost(market: &ResolvedMarket, multiplier: f64) -> SyntheticTier {
    let mut prices = SlotPrices::default();
    for (slot, best) in &market.prices {
        prices.set(*slot, Some(round2(best.price * multiplier)));
    }
    SyntheticTier { kind: TierKind::SuperBoost, prices }
}

/// Find the secondary-feed record of the same fixture
pub fn find_secondary<'a>(m: &Match, secondary: &'a [Match]) -> Option<&'a Match> {
    secondary.iter().find(|candidate| same_fixture(m, candidate))
}

/// First price any secondary bookmaker quotes for `slot`, labels resolved
/// against the secondary record's own team names
fn secondary_price(secondary: &Match, slot: OutcomeSlot) -> Option<f64> {
    secondary.quotes.iter().find_map(|quote| resolve_quote(quote, secondary).get(slot))
}

/// Mean of the observed primary-feed prices for `slot`
fn mean_price(resolved: &ResolvedOdds, slot: OutcomeSlot, excluded: &[String]) -> Option<f64> {
    let prices: Vec<f64> = resolved
        .observed()
        .filter(|entry| !excluded.iter().any(|key| *key == entry.key))
        .filter_map(|entry| entry.prices.get(slot))
        .collect();

    if prices.is_empty() {
        None
    } else {
        Some(round2(prices.iter().sum::<f64>() / prices.len() as f64))
    }
}

/// Standard tier for a match.
///
/// Per slot: the secondary feed's price when it has the fixture and the slot,
/// else the primary-feed mean, else (draw only) the implied draw.
pub fn standard(
    m: &Match,
    resolved: &ResolvedOdds,
    secondary: Option<&Match>,
    excluded: &[String],
) -> SyntheticTier {
    let mut prices = SlotPrices::default();

    for slot in &resolved.slots {
        let price = secondary
            .and_then(|record| secondary_price(record, *slot))
            .or_else(|| mean_price(resolved, *slot, excluded))
            .or_else(|| match slot {
                OutcomeSlot::Draw => resolved.implied_draw.map(round2),
                _ => None,
            });
        prices.set(*slot, price);
    }

    if secondary.is_none() {
        debug!("No secondary record for {}, Standard uses market means", m.key());
    }

    SyntheticTier { kind: TierKind::Standard, prices }
}

/// Boost tier: favorite and underdog of Standard lifted by `multiplier`.
/// With fewer than two priced slots there is no favorite/underdog pair and
/// Standard is copied as is.
pub fn boost(standard: &SyntheticTier, multiplier: f64) -> SyntheticTier {
    let priced: Vec<(OutcomeSlot, f64)> = standard.prices.priced().collect();
    let mut prices = standard.prices;

    if priced.len() >= 2 {
        let favorite = priced
            .iter()
            .copied()
            .reduce(|lowest, next| if next.1 < lowest.1 { next } else { lowest })
            .map(|(slot, _)| slot);
        let underdog = priced
            .iter()
            .copied()
            .filter(|(slot, _)| Some(*slot) != favorite)
            .reduce(|highest, next| if next.1 > highest.1 { next } else { highest })
            .map(|(slot, _)| slot);

        for slot in [favorite, underdog].into_iter().flatten() {
            let lifted = standard.prices.get(slot).map(|price| round2(price * multiplier));
            prices.set(slot, lifted);
        }
    }

    SyntheticTier { kind: TierKind::Boost, prices }
}

/// All three tiers for a resolved match
pub fn compute_tiers(
    m: &Match,
    resolved: &ResolvedOdds,
    market: &ResolvedMarket,
    secondary: Option<&Match>,
    excluded: &[String],
    multiplier: f64,
) -> SyntheticTiers {
    let standard = standard(m, resolved, secondary, excluded);
    let boost = boost(&standard, multiplier);
    let super_boost = super_boost(market, multiplier);
    SyntheticTiers { standard, boost, super_boost }
}

/// Render a tier as a quote labelled with the match's own team names, so it
/// can be ranked alongside real bookmakers.
pub fn tier_quote(tier: &SyntheticTier, m: &Match, rows: &TierRowConfig) -> BookmakerQuote {
    let outcomes = tier
        .prices
        .priced()
        .map(|(slot, price)| {
            let label = m.team_for(slot).unwrap_or("Draw");
            OutcomePrice::new(label, price)
        })
        .collect();
    BookmakerQuote::new(rows.key(tier.kind), rows.title(tier.kind), outcomes)
}
