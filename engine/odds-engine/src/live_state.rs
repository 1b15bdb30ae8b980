//! Best-effort match clock
//!
//! Estimates the phase of a match purely from the time since kickoff, assuming
//! one default soccer-length profile. This is approximate and is always
//! overridden by an authoritative status from the live-score feed.

use crate::models::Match;
use chrono::{DateTime, Utc};
use std::fmt;

/// Beyond this many minutes after kickoff the match is treated as finished or unknown
pub const ESTIMATE_CEILING_MINUTES: i64 = 150;

/// Estimated phase of a match with the minute to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivePhase {
    FirstHalf(i64),
    HalfTime,
    SecondHalf(i64),
    /// Minutes past 90
    Stoppage(i64),
    ExtraTime(i64),
    /// Past 120 minutes of play
    ExtraTimeLate,
}

impl fmt::Display for LivePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LivePhase::FirstHalf(minute) | LivePhase::SecondHalf(minute) | LivePhase::ExtraTime(minute) => {
                write!(f, "{minute}'")
            }
            LivePhase::HalfTime => f.write_str("HT"),
            LivePhase::Stoppage(extra) => write!(f, "90+{extra}'"),
            LivePhase::ExtraTimeLate => f.write_str("120+'"),
        }
    }
}

/// Classify the elapsed time since kickoff. `None` before kickoff and at or
/// beyond the ceiling.
pub fn estimate_phase(commence_time: DateTime<Utc>, now: DateTime<Utc>) -> Option<LivePhase> {
    if now < commence_time {
        return None;
    }

    let elapsed = (now - commence_time).num_minutes();
    let phase = match elapsed {
        0..=44 => LivePhase::FirstHalf(elapsed),
        45..=59 => LivePhase::HalfTime,
        60..=89 => LivePhase::SecondHalf(elapsed - 15),
        90..=104 => LivePhase::Stoppage(elapsed - 90),
        105..=119 => LivePhase::ExtraTime(elapsed - 15),
        120..=149 => LivePhase::ExtraTimeLate,
        _ => return None,
    };
    Some(phase)
}

/// Display label of the estimated phase, e.g. `"23'"` or `"HT"`
pub fn estimate_elapsed(commence_time: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    estimate_phase(commence_time, now).map(|phase| phase.to_string())
}

/// Status to show for a match: the live feed's status when present, "FT" for
/// completed matches, otherwise the estimate.
pub fn display_status(m: &Match, now: DateTime<Utc>) -> Option<String> {
    if let Some(live) = &m.live_score {
        if let Some(status) = live.match_status.as_deref().map(str::trim) {
            if !status.is_empty() {
                return Some(status.to_string());
            }
        }
        if live.completed {
            return Some("FT".to_string());
        }
    }

    if m.completed {
        return Some("FT".to_string());
    }

    estimate_elapsed(m.commence_time, now)
}
