use anyhow::{Context, Result};
use config::{Config, Environment, File};
use odds_engine::{EngineConfig, FeedKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `ODDS__SCHEDULER__REFRESH_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "ODDS";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "odds-fetcher";

/// Placeholder replaced with each configured sport key
pub const SPORT_PLACEHOLDER: &str = "{sport}";

/// Configuration for the odds fetcher service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub feeds: FeedConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Matches with bookmaker quotes. May contain `{sport}`.
    pub primary_url: String,

    /// Baseline prices for the Standard tier; empty disables the feed
    pub secondary_url: String,

    /// Completed matches with scores
    pub historical_url: String,

    /// Live scores; empty disables the feed
    pub live_scores_url: String,

    /// Sport keys substituted into `{sport}`
    pub sports: Vec<String>,

    /// Bookmaker regions requested from the odds API
    pub regions: String,

    /// API key environment variable name
    pub api_key_env: String,

    /// Days of results requested from the historical feed
    pub historical_days: u32,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between automatic refreshes
    pub refresh_interval_secs: u64,

    pub enable_secondary: bool,
    pub enable_live_scores: bool,

    /// Retry policy for the primary feed
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_retries: u32,

    /// Initial retry delay in seconds
    pub initial_delay_secs: u64,

    /// Maximum retry delay in seconds
    pub max_delay_secs: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,

    /// `pretty`, `json` or `compact`
    pub format: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://api.the-odds-api.com/v4/sports/{sport}/odds".to_string(),
            secondary_url: String::new(),
            historical_url: "https://api.the-odds-api.com/v4/sports/{sport}/scores".to_string(),
            live_scores_url: String::new(),
            sports: vec!["soccer_epl".to_string(), "basketball_nba".to_string()],
            regions: "uk".to_string(),
            api_key_env: "ODDS_API_KEY".to_string(),
            historical_days: 3,
            timeout_secs: 30,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            enable_secondary: true,
            enable_live_scores: true,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_secs: 5,
            max_delay_secs: 300,
            backoff_multiplier: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            feeds: FeedConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl FeedConfig {
    /// URL template of a feed, `None` when the feed is disabled
    pub fn url(&self, feed: FeedKind) -> Option<&str> {
        let url = match feed {
            FeedKind::Primary => &self.primary_url,
            FeedKind::Secondary => &self.secondary_url,
            FeedKind::Historical => &self.historical_url,
            FeedKind::LiveScores => &self.live_scores_url,
        };
        let url = url.trim();
        (!url.is_empty()).then_some(url)
    }
}

impl FetcherConfig {
    /// Load defaults, then the config file, then `ODDS__` environment variables.
    ///
    /// Without an explicit path, `odds-fetcher.{toml,json,yaml}` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default()).context("Failed to serialize default configuration")?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Self = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment and the default file
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.feeds.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate().context("Invalid engine configuration")?;

        if self.feeds.url(FeedKind::Primary).is_none() {
            anyhow::bail!("feeds.primary_url must be set");
        }
        if self.scheduler.refresh_interval_secs == 0 {
            anyhow::bail!("scheduler.refresh_interval_secs must be at least 1");
        }
        if self.scheduler.retry.backoff_multiplier < 1.0 {
            anyhow::bail!(
                "scheduler.retry.backoff_multiplier must be >= 1.0, got {}",
                self.scheduler.retry.backoff_multiplier
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FetcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feeds.url(FeedKind::Secondary), None);
        assert!(config.feeds.url(FeedKind::Primary).unwrap().contains(SPORT_PLACEHOLDER));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [feeds]
            secondary_url = "https://baseline.example/odds"
            sports = ["soccer_spain_la_liga"]

            [scheduler]
            refresh_interval_secs = 15

            [scheduler.retry]
            max_retries = 5

            [engine]
            boost_multiplier = 1.1
            "#,
        );

        let config = FetcherConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.feeds.url(FeedKind::Secondary), Some("https://baseline.example/odds"));
        assert_eq!(config.feeds.sports, vec!["soccer_spain_la_liga".to_string()]);
        assert_eq!(config.scheduler.refresh_interval_secs, 15);
        assert_eq!(config.scheduler.retry.max_retries, 5);
        assert_eq!(config.scheduler.retry.backoff_multiplier, 2.0);
        assert_eq!(config.engine.boost_multiplier, 1.1);
        assert_eq!(config.engine.platform_key, "funbet");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        let file = write_config("[scheduler]\nrefresh_interval_secs = 0\n");
        assert!(FetcherConfig::load(Some(file.path())).is_err());

        let file = write_config("[engine]\nmin_draw_probability = 1.5\n");
        assert!(FetcherConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(FetcherConfig::load(Some(&missing)).is_err());
    }
}
