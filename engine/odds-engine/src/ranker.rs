//! Bookmaker deduplication and display ordering

use crate::matcher::resolve_quote;
use crate::models::{BookmakerQuote, Match, OutcomeSlot, SlotPrices};
use crate::resolver::slots_for;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Quote rows shown before the list is expanded
pub const DEFAULT_VISIBLE_QUOTES: usize = 4;

/// Prices of a quote limited to the slots the match's sport has
fn match_prices(quote: &BookmakerQuote, m: &Match) -> SlotPrices {
    resolve_quote(quote, m).restricted_to(&slots_for(m))
}

/// Total payout of a quote: the sum of its slot-resolved prices
pub fn payout_total(quote: &BookmakerQuote, m: &Match) -> f64 {
    match_prices(quote, m).total()
}

/// Collapse quotes sharing a title, keeping the one with the highest total
/// payout (first seen on ties). Output keeps first-seen title order.
pub fn dedupe_by_title(quotes: &[BookmakerQuote], m: &Match) -> Vec<BookmakerQuote> {
    let mut kept: Vec<(&BookmakerQuote, f64)> = Vec::with_capacity(quotes.len());
    let mut index_by_title: HashMap<&str, usize> = HashMap::new();

    for quote in quotes {
        let total = payout_total(quote, m);
        match index_by_title.get(quote.title.as_str()) {
            Some(&index) => {
                if total > kept[index].1 {
                    debug!(
                        "Replacing duplicate '{}' entry (total {:.2} -> {:.2})",
                        quote.title, kept[index].1, total
                    );
                    kept[index] = (quote, total);
                }
            }
            None => {
                index_by_title.insert(quote.title.as_str(), kept.len());
                kept.push((quote, total));
            }
        }
    }

    kept.into_iter().map(|(quote, _)| quote.clone()).collect()
}

/// Descending order on optional prices, missing prices last
fn compare_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn priority_rank(key: &str, priority: &[String]) -> usize {
    priority.iter().position(|p| p == key).unwrap_or(priority.len())
}

/// Order quotes for display without deduplicating them.
///
/// Price order is descending by the `sort` slot (quotes lacking it last) or by
/// total payout when no column is selected. Keys in `priority` are then pinned
/// ahead of everything else in list order; the sort is stable so price order
/// survives inside each priority band.
pub fn order(
    quotes: &[BookmakerQuote],
    m: &Match,
    sort: Option<OutcomeSlot>,
    priority: &[String],
) -> Vec<BookmakerQuote> {
    let mut scored: Vec<(BookmakerQuote, SlotPrices)> = quotes
        .iter()
        .map(|quote| (quote.clone(), match_prices(quote, m)))
        .collect();

    match sort {
        Some(slot) => scored.sort_by(|a, b| compare_desc(a.1.get(slot), b.1.get(slot))),
        None => scored.sort_by(|a, b| b.1.total().total_cmp(&a.1.total())),
    }
    scored.sort_by_key(|(quote, _)| priority_rank(&quote.key, priority));

    scored.into_iter().map(|(quote, _)| quote).collect()
}

/// Deduplicate by title, then [`order`]
pub fn rank(
    quotes: &[BookmakerQuote],
    m: &Match,
    sort: Option<OutcomeSlot>,
    priority: &[String],
) -> Vec<BookmakerQuote> {
    order(&dedupe_by_title(quotes, m), m, sort, priority)
}

/// Rows to display: the first `limit` unless the list is expanded
pub fn visible<T>(ranked: &[T], limit: usize, expanded: bool) -> &[T] {
    if expanded {
        ranked
    } else {
        &ranked[..ranked.len().min(limit)]
    }
}
