use crate::collaborators::LogoResolver;
use crate::config::CacheConfig;
use crate::models::{OutcomeSlot, ResolvedMarket};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Logo lookups memoized per `(team, sport_key)` with TTL
pub struct LogoCache<R> {
    config: CacheConfig,
    resolver: R,
    entries: HashMap<(String, String), CachedLogo>,
}

#[derive(Debug, Clone)]
struct CachedLogo {
    /// `None` is cached too, so unknown teams are not looked up every refresh
    url: Option<String>,
    cached_at: DateTime<Utc>,
}

fn cache_key(team: &str, sport_key: &str) -> (String, String) {
    (team.trim().to_lowercase(), sport_key.to_string())
}

impl<R: LogoResolver> LogoCache<R> {
    pub fn new(config: CacheConfig, resolver: R) -> Self {
        Self {
            config,
            resolver,
            entries: HashMap::new(),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_seconds as i64)
    }

    /// Logo for a team, resolving and caching on miss or expiry
    pub fn resolve(&mut self, team: &str, sport_key: &str) -> Option<String> {
        self.resolve_at(team, sport_key, Utc::now())
    }

    pub fn resolve_at(&mut self, team: &str, sport_key: &str, now: DateTime<Utc>) -> Option<String> {
        let key = cache_key(team, sport_key);

        if let Some(cached) = self.entries.get(&key) {
            if now - cached.cached_at <= self.ttl() {
                return cached.url.clone();
            }
            debug!("Logo cache entry for {} ({}) expired", team, sport_key);
        }

        let url = self.resolver.resolve_logo(team, sport_key);
        self.store(key, url.clone(), now);
        url
    }

    fn store(&mut self, key: (String, String), url: Option<String>, now: DateTime<Utc>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_size {
            // Drop the oldest entries to make room
            let mut ages: Vec<_> = self.entries.iter().map(|(k, v)| (k.clone(), v.cached_at)).collect();
            ages.sort_by_key(|(_, cached_at)| *cached_at);

            let to_remove = ages.len() + 1 - self.config.max_size;
            for (old, _) in ages.into_iter().take(to_remove) {
                self.entries.remove(&old);
            }
            info!("Logo cache size limit reached, removed {} old entries", to_remove);
        }

        self.entries.insert(key, CachedLogo { url, cached_at: now });
    }

    /// Forget one team's logo. Returns whether it was cached.
    pub fn evict(&mut self, team: &str, sport_key: &str) -> bool {
        self.entries.remove(&cache_key(team, sport_key)).is_some()
    }

    /// Remove entries older than the TTL
    pub fn clear_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl();
        let initial = self.entries.len();
        self.entries.retain(|_, cached| now - cached.cached_at <= ttl);

        let removed = initial - self.entries.len();
        if removed > 0 {
            info!("Cleared {} expired logo cache entries", removed);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Direction of a best price since the previous observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    Up,
    Down,
    Unchanged,
    /// First observation for this match and slot
    New,
}

/// Remembers the last best price per `(match key, slot)`
#[derive(Debug, Default)]
pub struct OddsMovementTracker {
    last: HashMap<(String, OutcomeSlot), f64>,
}

impl OddsMovementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `price` and report how it moved
    pub fn observe(&mut self, match_key: &str, slot: OutcomeSlot, price: f64) -> Movement {
        let previous = self.last.insert((match_key.to_string(), slot), price);
        match previous {
            None => Movement::New,
            Some(old) if price > old => Movement::Up,
            Some(old) if price < old => Movement::Down,
            Some(_) => Movement::Unchanged,
        }
    }

    /// Observe every best price of a market
    pub fn observe_market(&mut self, match_key: &str, market: &ResolvedMarket) -> HashMap<OutcomeSlot, Movement> {
        market
            .prices
            .iter()
            .map(|(slot, best)| (*slot, self.observe(match_key, *slot, best.price)))
            .collect()
    }

    /// Forget a match, e.g. once it left the snapshot
    pub fn evict(&mut self, match_key: &str) -> usize {
        let initial = self.last.len();
        self.last.retain(|(key, _), _| key != match_key);
        initial - self.last.len()
    }

    /// Keep only matches still present in the snapshot
    pub fn retain_matches(&mut self, live_keys: &[String]) {
        self.last.retain(|(key, _), _| live_keys.contains(key));
    }

    pub fn clear(&mut self) {
        self.last.clear();
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BestPrice;
    use std::cell::Cell;

    struct CountingResolver {
        calls: Cell<usize>,
    }

    impl LogoResolver for CountingResolver {
        fn resolve_logo(&self, team: &str, _sport_key: &str) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            (team != "Unknown").then(|| format!("https://logos.test/{}.png", team.to_lowercase()))
        }
    }

    fn logo_cache(ttl_seconds: u64, max_size: usize) -> LogoCache<CountingResolver> {
        LogoCache::new(CacheConfig { ttl_seconds, max_size }, CountingResolver { calls: Cell::new(0) })
    }

    #[test]
    fn test_logo_lookups_are_memoized() {
        let mut cache = logo_cache(60, 10);
        let now = Utc::now();

        let url = cache.resolve_at("Arsenal", "soccer_epl", now);
        assert_eq!(url.as_deref(), Some("https://logos.test/arsenal.png"));
        assert_eq!(cache.resolve_at("arsenal ", "soccer_epl", now), url);
        assert_eq!(cache.resolver.calls.get(), 1);

        // negative results are cached as well
        assert_eq!(cache.resolve_at("Unknown", "soccer_epl", now), None);
        assert_eq!(cache.resolve_at("Unknown", "soccer_epl", now), None);
        assert_eq!(cache.resolver.calls.get(), 2);
    }

    #[test]
    fn test_expired_entries_are_refreshed_and_cleared() {
        let mut cache = logo_cache(60, 10);
        let start = Utc::now();
        cache.resolve_at("Arsenal", "soccer_epl", start);
        cache.resolve_at("Chelsea", "soccer_epl", start + Duration::seconds(50));

        cache.resolve_at("Arsenal", "soccer_epl", start + Duration::seconds(61));
        assert_eq!(cache.resolver.calls.get(), 3);

        assert_eq!(cache.clear_expired(start + Duration::seconds(115)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_size_limit_evicts_oldest() {
        let mut cache = logo_cache(600, 2);
        let start = Utc::now();
        cache.resolve_at("A", "s", start);
        cache.resolve_at("B", "s", start + Duration::seconds(1));
        cache.resolve_at("C", "s", start + Duration::seconds(2));

        assert_eq!(cache.len(), 2);
        assert!(!cache.evict("A", "s"));
        assert!(cache.evict("B", "s"));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_movement_tracking() {
        let mut tracker = OddsMovementTracker::new();
        assert_eq!(tracker.observe("m1", OutcomeSlot::Home, 1.8), Movement::New);
        assert_eq!(tracker.observe("m1", OutcomeSlot::Home, 1.9), Movement::Up);
        assert_eq!(tracker.observe("m1", OutcomeSlot::Home, 1.7), Movement::Down);
        assert_eq!(tracker.observe("m1", OutcomeSlot::Home, 1.7), Movement::Unchanged);
        assert_eq!(tracker.observe("m2", OutcomeSlot::Home, 1.7), Movement::New);

        assert_eq!(tracker.evict("m1"), 1);
        assert_eq!(tracker.observe("m1", OutcomeSlot::Home, 1.7), Movement::New);

        tracker.retain_matches(&["m2".to_string()]);
        assert_eq!(tracker.len(), 1);
        tracker.clear();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_observe_market() {
        let mut tracker = OddsMovementTracker::new();
        let mut market = ResolvedMarket::default();
        market.prices.insert(OutcomeSlot::Home, BestPrice { price: 1.8, bookmaker_key: "a".into() });
        market.prices.insert(OutcomeSlot::Away, BestPrice { price: 4.2, bookmaker_key: "b".into() });
        tracker.observe_market("m1", &market);

        market.prices.insert(OutcomeSlot::Away, BestPrice { price: 4.0, bookmaker_key: "b".into() });
        let moves = tracker.observe_market("m1", &market);
        assert_eq!(moves[&OutcomeSlot::Home], Movement::Unchanged);
        assert_eq!(moves[&OutcomeSlot::Away], Movement::Down);
    }
}
