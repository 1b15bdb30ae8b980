//! Match cards for display
//!
//! Combines the engine output with the collaborators the pure pipeline does
//! not touch: logos, followed teams, price movement and the match clock.

use crate::cache::{LogoCache, Movement, OddsMovementTracker};
use crate::collaborators::{FollowedTeams, LogoResolver};
use crate::config::EngineConfig;
use crate::engine::{MatchOdds, PriceRow};
use crate::live_state::display_status;
use crate::models::{Match, OutcomeSlot, TeamScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Best price of a slot with its movement since the last refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPriceView {
    pub slot: OutcomeSlot,
    pub price: f64,
    pub bookmaker_key: String,
    pub movement: Movement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCard {
    pub match_key: String,
    pub home_team: String,
    pub away_team: String,
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub status: Option<String>,
    pub is_live: bool,
    pub scores: Vec<TeamScore>,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,

    /// Either team is followed by the user
    pub followed: bool,

    pub best: Vec<BestPriceView>,
    pub rows: Vec<PriceRow>,
    pub hidden_rows: usize,
    pub prediction: Option<serde_json::Value>,
}

pub struct Presenter<R, F> {
    logos: LogoCache<R>,
    followed: F,
    movements: OddsMovementTracker,
    visible_quotes: usize,
}

impl<R: LogoResolver, F: FollowedTeams> Presenter<R, F> {
    pub fn new(config: &EngineConfig, resolver: R, followed: F) -> Self {
        Self {
            logos: LogoCache::new(config.logo_cache.clone(), resolver),
            followed,
            movements: OddsMovementTracker::new(),
            visible_quotes: config.visible_quotes,
        }
    }

    /// Build the card for an evaluated match
    pub fn card(&mut self, m: &Match, odds: &MatchOdds, now: DateTime<Utc>, expanded: bool) -> MatchCard {
        let movements = self.movements.observe_market(&odds.match_key, &odds.market);
        let best = odds
            .market
            .prices
            .iter()
            .map(|(slot, best)| BestPriceView {
                slot: *slot,
                price: best.price,
                bookmaker_key: best.bookmaker_key.clone(),
                movement: movements.get(slot).copied().unwrap_or(Movement::New),
            })
            .collect();

        // Live feed scores win over the ones carried on the match record
        let (scores, is_live) = match &m.live_score {
            Some(live) if !live.scores.is_empty() => (live.scores.clone(), live.is_live),
            Some(live) => (m.scores.clone(), live.is_live),
            None => (m.scores.clone(), false),
        };

        MatchCard {
            match_key: odds.match_key.clone(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            sport_title: m.sport_title.clone(),
            commence_time: m.commence_time,
            status: display_status(m, now),
            is_live,
            scores,
            home_logo: self.logos.resolve_at(&m.home_team, &m.sport_key, now),
            away_logo: self.logos.resolve_at(&m.away_team, &m.sport_key, now),
            followed: self.followed.is_followed(&m.home_team) || self.followed.is_followed(&m.away_team),
            best,
            rows: odds.visible_rows(self.visible_quotes, expanded).to_vec(),
            hidden_rows: if expanded { 0 } else { odds.hidden_rows(self.visible_quotes) },
            prediction: m.prediction.clone(),
        }
    }

    /// Cards for a snapshot, followed matches first
    pub fn cards(&mut self, pairs: &[(Match, MatchOdds)], now: DateTime<Utc>, expanded: bool) -> Vec<MatchCard> {
        let mut cards: Vec<MatchCard> = pairs.iter().map(|(m, odds)| self.card(m, odds, now, expanded)).collect();
        cards.sort_by_key(|card| !card.followed);

        let live_keys: Vec<String> = pairs.iter().map(|(_, odds)| odds.match_key.clone()).collect();
        self.movements.retain_matches(&live_keys);
        let expired = self.logos.clear_expired(now);
        debug!("Built {} match cards ({} logo entries expired)", cards.len(), expired);

        cards
    }

    pub fn logos_mut(&mut self) -> &mut LogoCache<R> {
        &mut self.logos
    }

    pub fn movements_mut(&mut self) -> &mut OddsMovementTracker {
        &mut self.movements
    }
}
