//! Error types for the odds engine

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while turning feed records into engine values
#[derive(Error, Debug)]
pub enum EngineError {
    /// A record lacks a field the engine cannot work without
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Kickoff time present but not parseable
    #[error("Invalid commence time: {0}")]
    InvalidCommenceTime(String),

    /// Record did not decode into the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Engine configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
