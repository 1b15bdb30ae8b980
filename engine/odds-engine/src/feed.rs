//! Feed normalization
//!
//! Upstream feeds send loosely-typed JSON. Every record is decoded on its own
//! so a single malformed record is dropped without losing the rest of the batch.

use crate::error::{EngineError, Result};
use crate::matcher::names_equal;
use crate::models::{BookmakerQuote, LiveScore, Match, OutcomePrice, TeamScore};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Market key carrying head-to-head (match winner) prices
const HEAD_TO_HEAD_MARKET: &str = "h2h";

/// Upstream feed a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Live and upcoming matches with bookmaker quotes
    Primary,
    /// Baseline prices for the Standard tier
    Secondary,
    /// Completed matches
    Historical,
    LiveScores,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedKind::Primary => "primary",
            FeedKind::Secondary => "secondary",
            FeedKind::Historical => "historical",
            FeedKind::LiveScores => "live_scores",
        };
        f.write_str(name)
    }
}

/// Kickoff as sent upstream: RFC 3339 text or Unix seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Text(String),
    Unix(i64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOutcome {
    pub name: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub key: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBookmaker {
    pub key: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub markets: Vec<RawMarket>,
}

/// Match record shared by the primary, secondary and historical feeds
#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
    pub id: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub sport_key: Option<String>,
    pub sport_title: Option<String>,
    pub commence_time: Option<RawTime>,
    #[serde(default)]
    pub bookmakers: Vec<RawBookmaker>,
    pub completed: Option<bool>,
    pub scores: Option<Value>,
    pub prediction: Option<Value>,
}

/// Live-score feed record
#[derive(Debug, Clone, Deserialize)]
pub struct RawLiveScore {
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub scores: Option<Value>,
    pub match_status: Option<String>,
    pub is_live: Option<bool>,
    pub completed: Option<bool>,
}

/// Live score tagged with the fixture it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveScoreEntry {
    pub home_team: String,
    pub away_team: String,
    pub score: LiveScore,
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(EngineError::MissingField(field))
}

fn parse_commence_time(raw: RawTime) -> Result<DateTime<Utc>> {
    match raw {
        RawTime::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|time| time.with_timezone(&Utc))
            .map_err(|_| EngineError::InvalidCommenceTime(text)),
        RawTime::Unix(seconds) => Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| EngineError::InvalidCommenceTime(seconds.to_string())),
    }
}

fn score_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Scores arrive either as `[{name, score}]` or as `{home, away}`
fn parse_scores(value: Option<&Value>, home_team: &str, away_team: &str) -> Vec<TeamScore> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let name = entry.get("name")?.as_str()?.to_string();
                let score = score_text(entry.get("score")?)?;
                Some(TeamScore { name, score })
            })
            .collect(),
        Some(Value::Object(sides)) => [("home", home_team), ("away", away_team)]
            .into_iter()
            .filter_map(|(side, team)| {
                let score = score_text(sides.get(side)?)?;
                Some(TeamScore { name: team.to_string(), score })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Keep usable outcomes of a bookmaker; prefer the head-to-head market when
/// markets are keyed, otherwise flatten every market.
fn normalize_bookmaker(raw: RawBookmaker) -> Option<BookmakerQuote> {
    let key = raw.key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let (key, title) = match (key, title) {
        (Some(key), Some(title)) => (key, title),
        (Some(key), None) => (key.clone(), key),
        (None, Some(title)) => (title.clone(), title),
        (None, None) => return None,
    };

    let head_to_head = raw
        .markets
        .iter()
        .position(|market| market.key.as_deref() == Some(HEAD_TO_HEAD_MARKET));
    let markets = match head_to_head {
        Some(index) => vec![raw.markets[index].clone()],
        None => raw.markets,
    };

    let outcomes: Vec<OutcomePrice> = markets
        .into_iter()
        .flat_map(|market| market.outcomes)
        .filter_map(|outcome| {
            let name = outcome.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
            let price = outcome.price.filter(|p| p.is_finite() && *p > 0.0)?;
            Some(OutcomePrice { name, price })
        })
        .collect();

    if outcomes.is_empty() {
        debug!("Bookmaker '{}' has no usable outcomes", title);
        return None;
    }

    Some(BookmakerQuote { key, title, outcomes })
}

/// Convert a decoded record into a [`Match`]
pub fn normalize_match(raw: RawMatch, feed: FeedKind) -> Result<Match> {
    let home_team = required(raw.home_team, "home_team")?;
    let away_team = required(raw.away_team, "away_team")?;
    let commence_time =
        parse_commence_time(raw.commence_time.ok_or(EngineError::MissingField("commence_time"))?)?;

    let quotes = raw.bookmakers.into_iter().filter_map(normalize_bookmaker).collect();
    let scores = parse_scores(raw.scores.as_ref(), &home_team, &away_team);

    Ok(Match {
        id: raw.id.filter(|id| !id.trim().is_empty()),
        sport_key: raw.sport_key.unwrap_or_default(),
        sport_title: raw.sport_title.unwrap_or_default(),
        commence_time,
        quotes,
        live_score: None,
        completed: raw.completed.unwrap_or(feed == FeedKind::Historical),
        scores,
        prediction: raw.prediction.filter(|p| !p.is_null()),
        home_team,
        away_team,
    })
}

/// Decode and normalize a single JSON record
pub fn normalize_value(value: Value, feed: FeedKind) -> Result<Match> {
    let raw: RawMatch = serde_json::from_value(value)?;
    normalize_match(raw, feed)
}

/// Normalize a feed response. Malformed records are logged and dropped.
pub fn normalize_batch(values: Vec<Value>, feed: FeedKind) -> Vec<Match> {
    let total = values.len();
    let matches: Vec<Match> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match normalize_value(value, feed) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Dropping malformed {} record #{}: {}", feed, index, e);
                None
            }
        })
        .collect();

    if matches.len() < total {
        warn!("Normalized {}/{} {} records", matches.len(), total, feed);
    } else {
        debug!("Normalized {} {} records", total, feed);
    }
    matches
}

/// Convert a live-score record
pub fn normalize_live_score(raw: RawLiveScore) -> Result<LiveScoreEntry> {
    let home_team = required(raw.home_team, "home_team")?;
    let away_team = required(raw.away_team, "away_team")?;
    let scores = parse_scores(raw.scores.as_ref(), &home_team, &away_team);

    Ok(LiveScoreEntry {
        score: LiveScore {
            scores,
            match_status: raw.match_status.filter(|s| !s.trim().is_empty()),
            is_live: raw.is_live.unwrap_or(false),
            completed: raw.completed.unwrap_or(false),
        },
        home_team,
        away_team,
    })
}

/// Normalize a live-score feed response, dropping malformed records
pub fn normalize_live_scores(values: Vec<Value>) -> Vec<LiveScoreEntry> {
    values
        .into_iter()
        .filter_map(|value| {
            let parsed = serde_json::from_value::<RawLiveScore>(value)
                .map_err(EngineError::from)
                .and_then(normalize_live_score);
            match parsed {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Dropping malformed {} record: {}", FeedKind::LiveScores, e);
                    None
                }
            }
        })
        .collect()
}

/// Attach live scores to matches by case-insensitive team-name equality.
/// Returns the number of matches that received a score.
pub fn attach_live_scores(matches: &mut [Match], scores: &[LiveScoreEntry]) -> usize {
    let mut attached = 0;
    for m in matches.iter_mut() {
        let found = scores.iter().find(|entry| {
            names_equal(&entry.home_team, &m.home_team) && names_equal(&entry.away_team, &m.away_team)
        });
        if let Some(entry) = found {
            m.live_score = Some(entry.score.clone());
            attached += 1;
        }
    }
    attached
}
