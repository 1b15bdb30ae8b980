//! Interfaces to services the engine consumes but does not own

use std::collections::HashSet;

/// Resolves a team's logo or flag image
pub trait LogoResolver {
    /// Image URL for `team` in `sport_key`, `None` when unknown
    fn resolve_logo(&self, team: &str, sport_key: &str) -> Option<String>;
}

/// Teams the user follows
pub trait FollowedTeams {
    fn is_followed(&self, team: &str) -> bool;
}

/// Case-insensitive membership; entries are expected lowercase
impl FollowedTeams for HashSet<String> {
    fn is_followed(&self, team: &str) -> bool {
        self.contains(&team.trim().to_lowercase())
    }
}

/// Resolver that knows no logos
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogos;

impl LogoResolver for NoLogos {
    fn resolve_logo(&self, _team: &str, _sport_key: &str) -> Option<String> {
        None
    }
}

impl<F> LogoResolver for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn resolve_logo(&self, team: &str, sport_key: &str) -> Option<String> {
        self(team, sport_key)
    }
}
