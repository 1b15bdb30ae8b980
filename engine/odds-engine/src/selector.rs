use crate::models::{BestPrice, OutcomeSlot, ResolvedMarket};
use crate::resolver::ResolvedOdds;

/// Highest observed price for `slot` among entries whose key is not in
/// `excluded`. Synthetic entries never count. Ties keep the first entry seen.
pub fn best_price(slot: OutcomeSlot, resolved: &ResolvedOdds, excluded: &[String]) -> Option<BestPrice> {
    let mut best: Option<BestPrice> = None;

    for entry in resolved.observed() {
        if excluded.iter().any(|key| *key == entry.key) {
            continue;
        }
        let Some(price) = entry.prices.get(slot) else {
            continue;
        };
        if best.as_ref().map_or(true, |current| price > current.price) {
            best = Some(BestPrice { price, bookmaker_key: entry.key.clone() });
        }
    }

    best
}

impl ResolvedMarket {
    /// Best price per slot of the match, skipping excluded keys
    pub fn from_resolved(resolved: &ResolvedOdds, excluded: &[String]) -> Self {
        let prices = resolved
            .slots
            .iter()
            .filter_map(|slot| best_price(*slot, resolved, excluded).map(|best| (*slot, best)))
            .collect();
        Self { prices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookmakerPrices, SlotPrices};

    fn entry(key: &str, home: Option<f64>, draw: Option<f64>, away: Option<f64>) -> BookmakerPrices {
        BookmakerPrices {
            key: key.to_string(),
            title: key.to_string(),
            prices: SlotPrices { home, draw, away },
            synthetic: false,
        }
    }

    fn resolved(entries: Vec<BookmakerPrices>) -> ResolvedOdds {
        ResolvedOdds {
            slots: vec![OutcomeSlot::Home, OutcomeSlot::Draw, OutcomeSlot::Away],
            per_bookmaker: entries,
            implied_draw: None,
        }
    }

    #[test]
    fn test_best_price_takes_maximum() {
        let odds = resolved(vec![
            entry("a", Some(1.8), Some(3.4), Some(4.2)),
            entry("b", Some(1.9), Some(3.3), None),
        ]);
        let best = best_price(OutcomeSlot::Home, &odds, &[]).unwrap();
        assert_eq!(best, BestPrice { price: 1.9, bookmaker_key: "b".to_string() });

        let best = best_price(OutcomeSlot::Away, &odds, &[]).unwrap();
        assert_eq!(best.bookmaker_key, "a");
    }

    #[test]
    fn test_best_price_skips_excluded_keys() {
        let odds = resolved(vec![
            entry("funbet_superboost", Some(9.0), None, None),
            entry("a", Some(1.8), None, None),
        ]);
        let excluded = vec!["funbet_superboost".to_string()];
        let best = best_price(OutcomeSlot::Home, &odds, &excluded).unwrap();
        assert_eq!(best.price, 1.8);

        let excluded = vec!["funbet_superboost".to_string(), "a".to_string()];
        assert!(best_price(OutcomeSlot::Home, &odds, &excluded).is_none());
    }

    #[test]
    fn test_best_price_tie_keeps_first() {
        let odds = resolved(vec![entry("a", Some(2.0), None, None), entry("b", Some(2.0), None, None)]);
        assert_eq!(best_price(OutcomeSlot::Home, &odds, &[]).unwrap().bookmaker_key, "a");
    }

    #[test]
    fn test_implied_draw_entry_is_not_a_market_price() {
        let mut implied = entry("implied_draw", None, Some(4.85), None);
        implied.synthetic = true;
        let odds = resolved(vec![entry("a", Some(1.8), None, Some(4.2)), implied]);

        assert!(best_price(OutcomeSlot::Draw, &odds, &[]).is_none());
        let market = ResolvedMarket::from_resolved(&odds, &[]);
        assert!(market.get(OutcomeSlot::Draw).is_none());
        assert_eq!(market.prices.len(), 2);
    }

    #[test]
    fn test_market_only_contains_priced_slots() {
        let odds = resolved(vec![entry("a", Some(1.8), None, Some(4.2))]);
        let market = ResolvedMarket::from_resolved(&odds, &[]);
        assert_eq!(market.price(OutcomeSlot::Home), Some(1.8));
        assert_eq!(market.price(OutcomeSlot::Draw), None);
        assert_eq!(market.prices.len(), 2);
    }
}
