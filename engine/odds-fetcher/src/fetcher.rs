use crate::config::{FeedConfig, SPORT_PLACEHOLDER};
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use odds_engine::FeedKind;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Longest slice of an error body kept in a [`FetchError::Status`]
const ERROR_BODY_LIMIT: usize = 220;

/// Source of raw feed records
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every record of a feed as undecoded JSON
    async fn fetch(&self, feed: FeedKind) -> Result<Vec<Value>>;
}

/// Feed source backed by HTTP JSON endpoints
pub struct HttpFeedSource {
    feeds: FeedConfig,
    api_key: Option<String>,
    client: Client,
}

impl HttpFeedSource {
    pub fn new(feeds: FeedConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(feeds.timeout_secs))
            .build()?;

        if api_key.is_none() {
            info!("No API key in ${}, requesting feeds without one", feeds.api_key_env);
        }

        Ok(Self { feeds, api_key, client })
    }

    /// Concrete URLs of a feed, one per sport when the template has `{sport}`
    pub fn urls(&self, feed: FeedKind) -> Result<Vec<String>> {
        let template = self.feeds.url(feed).ok_or(FetchError::NotConfigured(feed))?;

        if template.contains(SPORT_PLACEHOLDER) {
            Ok(self
                .feeds
                .sports
                .iter()
                .map(|sport| template.replace(SPORT_PLACEHOLDER, sport))
                .collect())
        } else {
            Ok(vec![template.to_string()])
        }
    }

    fn query(&self, feed: FeedKind) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(key) = &self.api_key {
            query.push(("apiKey", key.clone()));
        }

        match feed {
            FeedKind::Primary | FeedKind::Secondary => {
                query.push(("regions", self.feeds.regions.clone()));
                query.push(("markets", "h2h".to_string()));
                query.push(("oddsFormat", "decimal".to_string()));
                query.push(("dateFormat", "iso".to_string()));
            }
            FeedKind::Historical => {
                query.push(("daysFrom", self.feeds.historical_days.to_string()));
            }
            FeedKind::LiveScores => {}
        }
        query
    }

    async fn fetch_url(&self, url: &str, feed: FeedKind) -> Result<Vec<Value>> {
        debug!("Fetching {} feed from: {}", feed, url);

        let response = self.client.get(url).query(&self.query(feed)).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let snippet: String = body.trim().replace(['\n', '\r'], " ").chars().take(ERROR_BODY_LIMIT).collect();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: snippet,
            });
        }

        records(serde_json::from_str(&body)?, url)
    }
}

/// Records of a response body: a bare list or a `{"data": [...]}` envelope
pub fn records(body: Value, url: &str) -> Result<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(FetchError::UnexpectedShape(url.to_string())),
        },
        _ => Err(FetchError::UnexpectedShape(url.to_string())),
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed: FeedKind) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        for url in self.urls(feed)? {
            let records = self.fetch_url(&url, feed).await?;
            debug!("Fetched {} {} records from {}", records.len(), feed, url);
            all.extend(records);
        }

        info!("Successfully fetched {} {} records", all.len(), feed);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(feeds: FeedConfig) -> HttpFeedSource {
        HttpFeedSource::new(feeds, Some("secret".to_string())).unwrap()
    }

    #[test]
    fn test_urls_expand_sport_placeholder() {
        let source = source(FeedConfig::default());
        let urls = source.urls(FeedKind::Primary).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://api.the-odds-api.com/v4/sports/soccer_epl/odds".to_string(),
                "https://api.the-odds-api.com/v4/sports/basketball_nba/odds".to_string(),
            ]
        );
    }

    #[test]
    fn test_disabled_feed_is_not_configured() {
        let source = source(FeedConfig::default());
        assert!(matches!(
            source.urls(FeedKind::LiveScores),
            Err(FetchError::NotConfigured(FeedKind::LiveScores))
        ));

        let feeds = FeedConfig { live_scores_url: "https://scores.example/live".to_string(), ..Default::default() };
        assert_eq!(source_urls(feeds, FeedKind::LiveScores), vec!["https://scores.example/live".to_string()]);
    }

    fn source_urls(feeds: FeedConfig, feed: FeedKind) -> Vec<String> {
        source(feeds).urls(feed).unwrap()
    }

    #[test]
    fn test_query_depends_on_feed() {
        let source = source(FeedConfig::default());
        let primary = source.query(FeedKind::Primary);
        assert!(primary.contains(&("apiKey", "secret".to_string())));
        assert!(primary.contains(&("markets", "h2h".to_string())));

        let historical = source.query(FeedKind::Historical);
        assert!(historical.contains(&("daysFrom", "3".to_string())));
        assert!(!historical.iter().any(|(name, _)| *name == "markets"));
    }

    #[test]
    fn test_records_accept_list_and_envelope() {
        let list = records(json!([{"id": "a"}, {"id": "b"}]), "u").unwrap();
        assert_eq!(list.len(), 2);

        let envelope = records(json!({"data": [{"id": "a"}]}), "u").unwrap();
        assert_eq!(envelope.len(), 1);

        assert!(matches!(records(json!({"error": "quota"}), "u"), Err(FetchError::UnexpectedShape(_))));
        assert!(matches!(records(json!("nope"), "u"), Err(FetchError::UnexpectedShape(_))));
    }

    #[test]
    fn test_transient_errors() {
        let status = |status| FetchError::Status { url: "u".into(), status, body: String::new() };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(401).is_transient());
        assert!(!FetchError::NotConfigured(FeedKind::Primary).is_transient());
    }
}
