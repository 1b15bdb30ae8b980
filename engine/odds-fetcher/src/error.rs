//! Error types for feed fetching

use odds_engine::FeedKind;
use thiserror::Error;

/// Result type alias for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Network failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body decoded but is neither a list nor `{"data": [...]}`
    #[error("Unexpected response shape from {0}")]
    UnexpectedShape(String),

    /// No URL configured for the feed
    #[error("Feed not configured: {0}")]
    NotConfigured(FeedKind),
}

impl FetchError {
    /// Whether retrying the request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
