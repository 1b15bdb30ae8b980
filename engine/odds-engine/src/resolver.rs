use crate::config::EngineConfig;
use crate::matcher::resolve_quote;
use crate::models::{BookmakerPrices, Match, OutcomeSlot, SlotPrices};
use crate::selector::best_price;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Floor applied to the implied draw probability before inversion
pub const DEFAULT_MIN_DRAW_PROBABILITY: f64 = 0.1;

/// Key of the entry carrying a draw price implied from Home/Away
pub const IMPLIED_DRAW_KEY: &str = "implied_draw";
pub const IMPLIED_DRAW_TITLE: &str = "Implied Draw";

/// Sport indicators whose rules allow a tied result
const DRAW_ELIGIBLE_SPORTS: [&str; 2] = ["soccer", "cricket"];

/// Slots and per-bookmaker prices of one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedOdds {
    /// `[Home, Draw, Away]` or `[Home, Away]`
    pub slots: Vec<OutcomeSlot>,

    /// One entry per quote in quote order, plus the implied draw entry if any
    pub per_bookmaker: Vec<BookmakerPrices>,

    pub implied_draw: Option<f64>,
}

impl ResolvedOdds {
    pub fn has_draw(&self) -> bool {
        self.slots.contains(&OutcomeSlot::Draw)
    }

    /// Entries quoted by real sources
    pub fn observed(&self) -> impl Iterator<Item = &BookmakerPrices> {
        self.per_bookmaker.iter().filter(|entry| !entry.synthetic)
    }
}

/// Whether the sport permits a draw (soccer, cricket)
pub fn is_draw_eligible(sport_key: &str, sport_title: &str) -> bool {
    let key = sport_key.to_lowercase();
    let title = sport_title.to_lowercase();
    DRAW_ELIGIBLE_SPORTS.iter().any(|sport| key.contains(sport) || title.contains(sport))
}

/// Ordered slot list for a match
pub fn slots_for(m: &Match) -> Vec<OutcomeSlot> {
    if is_draw_eligible(&m.sport_key, &m.sport_title) {
        vec![OutcomeSlot::Home, OutcomeSlot::Draw, OutcomeSlot::Away]
    } else {
        vec![OutcomeSlot::Home, OutcomeSlot::Away]
    }
}

/// Draw price implied by the Home and Away prices.
///
/// `p = max(min_probability, 1 - 1/home - 1/away)`, price `1/p`. The clamp keeps
/// the result finite and at most `1/min_probability`.
pub fn implied_draw_price(home: f64, away: f64, min_probability: f64) -> f64 {
    let probability = (1.0 - 1.0 / home - 1.0 / away).max(min_probability);
    1.0 / probability
}

/// Build slots and per-bookmaker slot prices for a match.
///
/// When the sport is draw-eligible and no quote carries a draw, a single
/// synthetic entry holding the implied draw is appended, derived from the best
/// Home and Away prices outside `config.excluded_keys()`.
pub fn resolve(m: &Match, config: &EngineConfig) -> ResolvedOdds {
    let slots = slots_for(m);

    let per_bookmaker: Vec<BookmakerPrices> = m
        .quotes
        .iter()
        .map(|quote| {
            let prices = resolve_quote(quote, m).restricted_to(&slots);
            if prices.is_empty() {
                debug!("No outcome of '{}' resolved for {}", quote.title, m.key());
            }
            BookmakerPrices {
                key: quote.key.clone(),
                title: quote.title.clone(),
                prices,
                synthetic: false,
            }
        })
        .collect();

    let mut resolved = ResolvedOdds { slots, per_bookmaker, implied_draw: None };

    let draw_quoted = resolved.per_bookmaker.iter().any(|entry| entry.prices.draw.is_some());
    if resolved.has_draw() && !draw_quoted {
        let excluded = config.excluded_keys();
        let home = best_price(OutcomeSlot::Home, &resolved, &excluded);
        let away = best_price(OutcomeSlot::Away, &resolved, &excluded);

        if let (Some(home), Some(away)) = (home, away) {
            let price = implied_draw_price(home.price, away.price, config.min_draw_probability);
            debug!(
                "Implied draw {:.3} for {} (home {:.2}, away {:.2})",
                price,
                m.key(),
                home.price,
                away.price
            );
            resolved.per_bookmaker.push(BookmakerPrices {
                key: IMPLIED_DRAW_KEY.to_string(),
                title: IMPLIED_DRAW_TITLE.to_string(),
                prices: SlotPrices { draw: Some(price), ..Default::default() },
                synthetic: true,
            });
            resolved.implied_draw = Some(price);
        }
    }

    resolved
}
