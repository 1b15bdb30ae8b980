//! Odds Fetcher Service
//!
//! Fetches the primary, secondary and live-score feeds on an interval or on
//! demand, runs every match through the odds engine and keeps the latest
//! snapshot in a shared cell.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod snapshot;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use fetcher::{FeedSource, HttpFeedSource};
pub use logging::initialize_logging_with_config;
pub use models::*;
pub use scheduler::{FetcherScheduler, RefreshCycle};
pub use snapshot::{Snapshot, SnapshotCell};
