//! Odds aggregation and synthetic pricing engine
//!
//! Merges bookmaker quotes for a match into one comparison view: a canonical
//! Home/Draw/Away outcome model, deduplicated and ranked bookmaker rows, the
//! best market price per outcome and three synthetic tiers (Standard, Boost,
//! SuperBoost) priced on top of the observed market.
//!
//! The library is synchronous and works on an in-memory snapshot; fetching
//! and scheduling live in `odds-fetcher`.

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod live_state;
pub mod matcher;
pub mod models;
pub mod presenter;
pub mod ranker;
pub mod resolver;
pub mod selector;
pub mod tiers;

pub use cache::{LogoCache, Movement, OddsMovementTracker};
pub use collaborators::{FollowedTeams, LogoResolver, NoLogos};
pub use config::{CacheConfig, EngineConfig, TierRowConfig};
pub use engine::{MatchOdds, OddsEngine, PriceRow};
pub use error::{EngineError, Result};
pub use feed::{FeedKind, LiveScoreEntry};
pub use live_state::{display_status, estimate_elapsed, estimate_phase, LivePhase};
pub use models::*;
pub use presenter::{MatchCard, Presenter};
pub use resolver::ResolvedOdds;
