use crate::config::{FetcherConfig, RetryConfig, SchedulerConfig};
use crate::error::{FetchError, Result as FetchResult};
use crate::fetcher::FeedSource;
use crate::models::FetcherEvent;
use crate::snapshot::{Snapshot, SnapshotCell};
use anyhow::{Context, Result};
use chrono::Utc;
use odds_engine::feed::{attach_live_scores, normalize_batch, normalize_live_scores};
use odds_engine::{FeedKind, Match, OddsEngine, OutcomeSlot};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// One refresh: fetch the feeds, evaluate every match, publish a snapshot
pub struct RefreshCycle {
    source: Arc<dyn FeedSource>,
    engine: Arc<OddsEngine>,
    cell: SnapshotCell,
    config: SchedulerConfig,
    sort: Option<OutcomeSlot>,
    generation: AtomicU64,
}

impl RefreshCycle {
    pub fn new(
        source: Arc<dyn FeedSource>,
        engine: Arc<OddsEngine>,
        cell: SnapshotCell,
        config: SchedulerConfig,
        sort: Option<OutcomeSlot>,
    ) -> Self {
        Self {
            source,
            engine,
            cell,
            config,
            sort,
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch a feed the snapshot can live without; failures yield no records
    async fn fetch_optional(&self, feed: FeedKind, enabled: bool) -> Vec<Value> {
        if !enabled {
            return Vec::new();
        }

        match self.source.fetch(feed).await {
            Ok(records) => records,
            Err(FetchError::NotConfigured(_)) => {
                debug!("{} feed not configured, skipping", feed);
                Vec::new()
            }
            Err(e) => {
                warn!("{} feed failed, continuing without it: {}", feed, e);
                Vec::new()
            }
        }
    }

    /// Run one refresh. Every outcome is reported as an event; a primary
    /// failure leaves the current snapshot in place.
    pub async fn run(&self) -> FetcherEvent {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting refresh #{}", generation);

        let primary = run_with_retry(|| self.source.fetch(FeedKind::Primary), &self.config.retry);
        let (primary, secondary, live) = tokio::join!(
            primary,
            self.fetch_optional(FeedKind::Secondary, self.config.enable_secondary),
            self.fetch_optional(FeedKind::LiveScores, self.config.enable_live_scores),
        );

        let primary = match primary {
            Ok(records) => records,
            Err(e) => {
                error!("Primary feed failed after retries: {}", e);
                self.cell.record_error(e.to_string()).await;
                return FetcherEvent::FetchFailed {
                    feed: FeedKind::Primary,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                };
            }
        };

        let mut matches = normalize_batch(primary, FeedKind::Primary);
        let secondary = normalize_batch(secondary, FeedKind::Secondary);
        let scores = normalize_live_scores(live);
        let live_scores = attach_live_scores(&mut matches, &scores);
        let odds = self.engine.evaluate_all(&matches, &secondary, self.sort);

        let match_count = matches.len();
        let snapshot = Snapshot {
            generation,
            fetched_at: Utc::now(),
            matches,
            odds,
            secondary_available: !secondary.is_empty(),
        };

        if !self.cell.publish(snapshot).await {
            return FetcherEvent::Discarded { generation, timestamp: Utc::now() };
        }

        info!(
            "Snapshot #{}: {} matches, {} with live scores, {} secondary records",
            generation,
            match_count,
            live_scores,
            secondary.len()
        );

        FetcherEvent::SnapshotUpdated {
            generation,
            matches: match_count,
            live_scores,
            secondary_available: !secondary.is_empty(),
            timestamp: Utc::now(),
        }
    }

    /// Completed matches from the historical feed. Not part of the snapshot.
    pub async fn fetch_historical(&self) -> FetchResult<Vec<Match>> {
        let records = run_with_retry(|| self.source.fetch(FeedKind::Historical), &self.config.retry).await?;
        Ok(normalize_batch(records, FeedKind::Historical))
    }
}

/// Run `f` until it succeeds, backing off exponentially between transient
/// failures. At least one attempt is always made.
pub async fn run_with_retry<F, Fut, T>(mut f: F, retry: &RetryConfig) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let attempts = retry.max_retries.max(1);
    let mut delay = Duration::from_secs(retry.initial_delay_secs);
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= attempts || !e.is_transient() => return Err(e),
            Err(e) => {
                warn!("Attempt {} failed: {}, retrying in {:?}", attempt, e, delay);
                sleep(delay).await;

                // Exponential backoff
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * retry.backoff_multiplier).min(retry.max_delay_secs as f64),
                );
                attempt += 1;
            }
        }
    }
}

/// Interval and on-demand refreshes of the odds snapshot
#[derive(Clone)]
pub struct FetcherScheduler {
    config: SchedulerConfig,
    cycle: Arc<RefreshCycle>,
    engine: Arc<OddsEngine>,
    cell: SnapshotCell,
    trigger: Arc<Notify>,
    stop: Arc<Notify>,
}

impl FetcherScheduler {
    pub fn new(config: &FetcherConfig, source: Arc<dyn FeedSource>, sort: Option<OutcomeSlot>) -> Result<Self> {
        let engine = Arc::new(OddsEngine::new(config.engine.clone()).context("Failed to create odds engine")?);
        let cell = SnapshotCell::new();
        let cycle = RefreshCycle::new(
            source,
            Arc::clone(&engine),
            cell.clone(),
            config.scheduler.clone(),
            sort,
        );

        Ok(Self {
            config: config.scheduler.clone(),
            cycle: Arc::new(cycle),
            engine,
            cell,
            trigger: Arc::new(Notify::new()),
            stop: Arc::new(Notify::new()),
        })
    }

    pub fn cell(&self) -> SnapshotCell {
        self.cell.clone()
    }

    pub fn engine(&self) -> &OddsEngine {
        &self.engine
    }

    /// Refresh now and wait for the result
    pub async fn refresh_once(&self) -> FetcherEvent {
        self.cycle.run().await
    }

    pub async fn fetch_historical(&self) -> Result<Vec<Match>> {
        let matches = self.cycle.fetch_historical().await.context("Failed to fetch historical matches")?;
        let event = FetcherEvent::HistoricalFetched { count: matches.len(), timestamp: Utc::now() };
        info!("Historical fetch completed: {:?}", event);
        Ok(matches)
    }

    /// Request a refresh from the running loop
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stop the loop and suppress writes from refreshes still in flight
    pub fn shutdown(&self) {
        info!("Shutting down odds refresh scheduler");
        self.cell.shutdown();
        self.stop.notify_one();
    }

    /// Run until [`FetcherScheduler::shutdown`]. Refreshes run as their own
    /// tasks; a new one never cancels one in flight.
    pub async fn start(&self) -> Result<()> {
        info!(
            "Starting odds refresh scheduler (every {}s)",
            self.config.refresh_interval_secs
        );

        let mut ticker = interval(Duration::from_secs(self.config.refresh_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.cell.is_alive() {
            tokio::select! {
                _ = ticker.tick() => debug!("Scheduled refresh"),
                _ = self.trigger.notified() => info!("Manual refresh requested"),
                _ = self.stop.notified() => break,
            }

            let cycle = Arc::clone(&self.cycle);
            tokio::spawn(async move {
                let event = cycle.run().await;
                debug!("Refresh finished: {:?}", event);
            });
        }

        info!("Odds refresh scheduler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::timeout;

    fn unavailable(status: u16) -> FetchError {
        FetchError::Status { url: "mock://primary".to_string(), status, body: String::new() }
    }

    fn primary_records() -> Vec<Value> {
        vec![json!({
            "id": "epl-1",
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "sport_key": "soccer_epl",
            "sport_title": "EPL",
            "commence_time": "2025-08-16T14:00:00Z",
            "bookmakers": [
                {"key": "bet365", "title": "Bet365", "markets": [{"key": "h2h", "outcomes": [
                    {"name": "Arsenal", "price": 1.8},
                    {"name": "Draw", "price": 3.4},
                    {"name": "Chelsea", "price": 4.2}
                ]}]},
                {"key": "williamhill", "title": "William Hill", "markets": [{"key": "h2h", "outcomes": [
                    {"name": "Arsenal", "price": 1.9},
                    {"name": "Draw", "price": 3.3},
                    {"name": "Chelsea", "price": 4.0}
                ]}]}
            ]
        })]
    }

    struct MockSource {
        primary: Mutex<VecDeque<FetchResult<Vec<Value>>>>,
        secondary: Option<Vec<Value>>,
        live: Vec<Value>,
        primary_calls: AtomicUsize,
    }

    impl MockSource {
        fn new(primary: Vec<FetchResult<Vec<Value>>>) -> Self {
            Self {
                primary: Mutex::new(primary.into()),
                secondary: None,
                live: Vec::new(),
                primary_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.primary_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedSource for MockSource {
        async fn fetch(&self, feed: FeedKind) -> FetchResult<Vec<Value>> {
            match feed {
                FeedKind::Primary => {
                    self.primary_calls.fetch_add(1, Ordering::SeqCst);
                    let next = self.primary.lock().unwrap().pop_front();
                    next.unwrap_or_else(|| Ok(primary_records()))
                }
                FeedKind::Secondary => self.secondary.clone().ok_or_else(|| unavailable(502)),
                FeedKind::LiveScores => Ok(self.live.clone()),
                FeedKind::Historical => Ok(vec![json!({
                    "home_team": "Liverpool",
                    "away_team": "Everton",
                    "commence_time": "2025-08-09T14:00:00Z",
                    "scores": [{"name": "Liverpool", "score": "3"}, {"name": "Everton", "score": "0"}]
                })]),
            }
        }
    }

    fn config(refresh_interval_secs: u64) -> FetcherConfig {
        let mut config = FetcherConfig::default();
        config.scheduler.refresh_interval_secs = refresh_interval_secs;
        config.scheduler.retry = RetryConfig {
            max_retries: 2,
            initial_delay_secs: 0,
            max_delay_secs: 0,
            backoff_multiplier: 2.0,
        };
        config
    }

    fn scheduler(source: Arc<MockSource>) -> FetcherScheduler {
        FetcherScheduler::new(&config(3600), source, None).unwrap()
    }

    async fn wait_for_generation(cell: &SnapshotCell, generation: u64) {
        timeout(Duration::from_secs(5), async {
            while cell.current().await.map_or(true, |s| s.generation < generation) {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("snapshot was not published in time");
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot_without_secondary() {
        let mut source = MockSource::new(vec![]);
        source.live = vec![json!({
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "scores": {"home": 1, "away": 1},
            "match_status": "HT",
            "is_live": true
        })];
        let scheduler = scheduler(Arc::new(source));

        let event = scheduler.refresh_once().await;
        match event {
            FetcherEvent::SnapshotUpdated { generation, matches, live_scores, secondary_available, .. } => {
                assert_eq!((generation, matches, live_scores), (1, 1, 1));
                assert!(!secondary_available);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let snapshot = scheduler.cell().current().await.unwrap();
        let (m, odds) = snapshot.find("epl-1").unwrap();
        assert!(m.live_score.is_some());
        // no secondary feed: Standard falls back to market means
        assert_eq!(odds.tiers.standard.prices.home, Some(1.85));
        assert_eq!(odds.market.price(OutcomeSlot::Home), Some(1.9));
    }

    #[tokio::test]
    async fn test_primary_failure_keeps_previous_snapshot() {
        let source = Arc::new(MockSource::new(vec![
            Ok(primary_records()),
            Err(unavailable(503)),
            Err(unavailable(503)),
        ]));
        let scheduler = scheduler(Arc::clone(&source));

        assert!(!scheduler.refresh_once().await.is_failure());
        let event = scheduler.refresh_once().await;
        assert!(event.is_failure());
        assert_eq!(source.calls(), 3);

        let cell = scheduler.cell();
        assert_eq!(cell.current().await.unwrap().generation, 1);
        assert!(cell.last_error().await.unwrap().contains("503"));

        // next success clears the error
        scheduler.refresh_once().await;
        assert_eq!(cell.current().await.unwrap().generation, 3);
        assert_eq!(cell.last_error().await, None);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let source = Arc::new(MockSource::new(vec![Err(unavailable(503)), Ok(primary_records())]));
        let scheduler = scheduler(Arc::clone(&source));

        assert!(!scheduler.refresh_once().await.is_failure());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let source = Arc::new(MockSource::new(vec![Err(unavailable(401))]));
        let scheduler = scheduler(Arc::clone(&source));

        assert!(scheduler.refresh_once().await.is_failure());
        assert_eq!(source.calls(), 1);
        assert!(scheduler.cell().current().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_retries_still_attempts_once() {
        let retry = RetryConfig { max_retries: 0, initial_delay_secs: 0, max_delay_secs: 0, backoff_multiplier: 1.0 };
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = run_with_retry(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(7)
            },
            &retry,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_after_shutdown_is_discarded() {
        let scheduler = scheduler(Arc::new(MockSource::new(vec![])));
        scheduler.shutdown();

        let event = scheduler.refresh_once().await;
        assert!(matches!(event, FetcherEvent::Discarded { generation: 1, .. }));
        assert!(scheduler.cell().current().await.is_none());
    }

    #[tokio::test]
    async fn test_loop_refreshes_on_start_and_trigger() {
        let scheduler = scheduler(Arc::new(MockSource::new(vec![])));
        let cell = scheduler.cell();

        let running = scheduler.clone();
        let handle = tokio::spawn(async move { running.start().await });

        // first interval tick fires immediately
        wait_for_generation(&cell, 1).await;

        scheduler.trigger();
        wait_for_generation(&cell, 2).await;

        scheduler.shutdown();
        let stopped = timeout(Duration::from_secs(5), handle).await.expect("loop did not stop");
        assert!(stopped.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_fetch_historical_marks_matches_completed() {
        let scheduler = scheduler(Arc::new(MockSource::new(vec![])));
        let matches = scheduler.fetch_historical().await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].completed);
        assert_eq!(matches[0].scores[0].score, "3");
    }
}
