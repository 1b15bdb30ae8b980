use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Result class a match can settle on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSlot {
    Home,
    Draw,
    Away,
}

impl OutcomeSlot {
    /// Slots in display order
    pub const ALL: [OutcomeSlot; 3] = [OutcomeSlot::Home, OutcomeSlot::Draw, OutcomeSlot::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeSlot::Home => "home",
            OutcomeSlot::Draw => "draw",
            OutcomeSlot::Away => "away",
        }
    }
}

impl fmt::Display for OutcomeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "1" => Ok(OutcomeSlot::Home),
            "draw" | "x" => Ok(OutcomeSlot::Draw),
            "away" | "2" => Ok(OutcomeSlot::Away),
            other => Err(format!("unknown outcome slot '{other}'")),
        }
    }
}

/// A single outcome label and its decimal price as quoted by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrice {
    /// Raw label as sent by the source (team name, "Draw", ...)
    pub name: String,

    /// Decimal payout multiplier, always > 0
    pub price: f64,
}

impl OutcomePrice {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self { name: name.into(), price }
    }
}

/// One source's complete set of outcome prices for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    /// Source identifier (may repeat across duplicate title entries)
    pub key: String,

    /// User-facing name, also the deduplication key
    pub title: String,

    pub outcomes: Vec<OutcomePrice>,
}

impl BookmakerQuote {
    pub fn new(key: impl Into<String>, title: impl Into<String>, outcomes: Vec<OutcomePrice>) -> Self {
        Self { key: key.into(), title: title.into(), outcomes }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub name: String,
    pub score: String,
}

/// Authoritative live state from the score feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveScore {
    pub scores: Vec<TeamScore>,

    /// Status string such as "45'", "HT" or "FT"
    pub match_status: Option<String>,

    pub is_live: bool,
    pub completed: bool,
}

/// A match snapshot with every quote fetched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub sport_key: String,
    pub sport_title: String,
    pub commence_time: DateTime<Utc>,
    pub quotes: Vec<BookmakerQuote>,
    pub live_score: Option<LiveScore>,
    pub completed: bool,
    pub scores: Vec<TeamScore>,

    /// Upstream prediction object, carried through untouched
    pub prediction: Option<serde_json::Value>,
}

impl Match {
    /// Create a match with no quotes
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        sport_key: impl Into<String>,
        sport_title: impl Into<String>,
        commence_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            home_team: home_team.into(),
            away_team: away_team.into(),
            sport_key: sport_key.into(),
            sport_title: sport_title.into(),
            commence_time,
            quotes: Vec::new(),
            live_score: None,
            completed: false,
            scores: Vec::new(),
            prediction: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_quotes(mut self, quotes: Vec<BookmakerQuote>) -> Self {
        self.quotes = quotes;
        self
    }

    /// Identity of the match: the feed id, or `home|away|commence_time` when
    /// the feed did not send one.
    pub fn key(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}|{}|{}", self.home_team, self.away_team, self.commence_time.to_rfc3339()),
        }
    }

    /// Team name for a side, `None` for the draw slot
    pub fn team_for(&self, slot: OutcomeSlot) -> Option<&str> {
        match slot {
            OutcomeSlot::Home => Some(&self.home_team),
            OutcomeSlot::Away => Some(&self.away_team),
            OutcomeSlot::Draw => None,
        }
    }
}

/// Optional price per slot. A missing price is "no price", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotPrices {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

impl SlotPrices {
    pub fn get(&self, slot: OutcomeSlot) -> Option<f64> {
        match slot {
            OutcomeSlot::Home => self.home,
            OutcomeSlot::Draw => self.draw,
            OutcomeSlot::Away => self.away,
        }
    }

    pub fn set(&mut self, slot: OutcomeSlot, price: Option<f64>) {
        match slot {
            OutcomeSlot::Home => self.home = price,
            OutcomeSlot::Draw => self.draw = price,
            OutcomeSlot::Away => self.away = price,
        }
    }

    /// Slots carrying a price, in display order
    pub fn priced(&self) -> impl Iterator<Item = (OutcomeSlot, f64)> + '_ {
        OutcomeSlot::ALL.into_iter().filter_map(move |slot| self.get(slot).map(|p| (slot, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.priced().next().is_none()
    }

    /// Sum of all present prices (total payout)
    pub fn total(&self) -> f64 {
        self.priced().map(|(_, price)| price).sum()
    }

    /// Copy keeping only the given slots
    pub fn restricted_to(&self, slots: &[OutcomeSlot]) -> SlotPrices {
        let mut restricted = SlotPrices::default();
        for slot in slots {
            restricted.set(*slot, self.get(*slot));
        }
        restricted
    }
}

/// Slot prices resolved for one quote (or the implied draw entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerPrices {
    pub key: String,
    pub title: String,
    pub prices: SlotPrices,

    /// Computed by the engine rather than quoted by a source
    pub synthetic: bool,
}

/// Highest observed price for a slot and who quoted it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPrice {
    pub price: f64,
    pub bookmaker_key: String,
}

/// Best market price per slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMarket {
    pub prices: BTreeMap<OutcomeSlot, BestPrice>,
}

impl ResolvedMarket {
    pub fn get(&self, slot: OutcomeSlot) -> Option<&BestPrice> {
        self.prices.get(&slot)
    }

    pub fn price(&self, slot: OutcomeSlot) -> Option<f64> {
        self.get(slot).map(|best| best.price)
    }
}

/// Synthetic pricing tier produced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierKind {
    Standard,
    Boost,
    SuperBoost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTier {
    pub kind: TierKind,
    pub prices: SlotPrices,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTiers {
    pub standard: SyntheticTier,
    pub boost: SyntheticTier,
    pub super_boost: SyntheticTier,
}

impl SyntheticTiers {
    /// Tiers in pinned display order
    pub fn iter(&self) -> impl Iterator<Item = &SyntheticTier> {
        [&self.super_boost, &self.boost, &self.standard].into_iter()
    }
}

/// Round to two decimals, the precision prices are displayed with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
