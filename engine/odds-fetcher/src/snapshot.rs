use chrono::{DateTime, Utc};
use odds_engine::{Match, MatchOdds};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Result of one successful refresh
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Refresh number that produced this snapshot
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub matches: Vec<Match>,

    /// Evaluated odds, index-aligned with `matches`
    pub odds: Vec<MatchOdds>,

    /// Whether the secondary feed contributed to Standard prices
    pub secondary_available: bool,
}

impl Snapshot {
    /// Matches paired with their odds
    pub fn pairs(&self) -> Vec<(Match, MatchOdds)> {
        self.matches.iter().cloned().zip(self.odds.iter().cloned()).collect()
    }

    pub fn find(&self, match_key: &str) -> Option<(&Match, &MatchOdds)> {
        self.odds
            .iter()
            .position(|odds| odds.match_key == match_key)
            .map(|index| (&self.matches[index], &self.odds[index]))
    }
}

#[derive(Debug, Default)]
pub struct SnapshotState {
    pub current: Option<Arc<Snapshot>>,

    /// Most recent primary-feed failure, cleared by the next success
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Shared holder of the latest snapshot.
///
/// Writes are last-write-wins. Once [`SnapshotCell::shutdown`] is called all
/// further writes are dropped, so refreshes still in flight at teardown
/// cannot publish.
#[derive(Debug, Clone)]
pub struct SnapshotCell {
    state: Arc<RwLock<SnapshotState>>,
    alive: Arc<AtomicBool>,
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SnapshotState::default())),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.state.read().await.current.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Replace the snapshot. Returns `false` when the cell is shut down.
    pub async fn publish(&self, snapshot: Snapshot) -> bool {
        if !self.is_alive() {
            debug!("Dropping snapshot #{} after shutdown", snapshot.generation);
            return false;
        }

        let mut state = self.state.write().await;
        state.current = Some(Arc::new(snapshot));
        state.last_error = None;
        state.last_error_at = None;
        true
    }

    /// Record a primary-feed failure, keeping the current snapshot
    pub async fn record_error(&self, error: impl Into<String>) -> bool {
        if !self.is_alive() {
            return false;
        }

        let mut state = self.state.write().await;
        state.last_error = Some(error.into());
        state.last_error_at = Some(Utc::now());
        true
    }

    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
