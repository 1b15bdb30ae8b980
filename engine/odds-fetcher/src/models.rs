use chrono::{DateTime, Utc};
use odds_engine::FeedKind;
use serde::Serialize;

/// Events emitted by the fetcher
#[derive(Debug, Clone, Serialize)]
pub enum FetcherEvent {
    /// A refresh published a new snapshot
    SnapshotUpdated {
        generation: u64,
        matches: usize,
        live_scores: usize,
        secondary_available: bool,
        timestamp: DateTime<Utc>,
    },

    /// Completed matches fetched on demand
    HistoricalFetched {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Primary feed failed; the previous snapshot stays current
    FetchFailed {
        feed: FeedKind,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Refresh finished after shutdown and was not published
    Discarded {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
}

impl FetcherEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetcherEvent::FetchFailed { .. })
    }
}
