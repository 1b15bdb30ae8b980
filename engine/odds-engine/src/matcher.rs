//! Outcome label to slot resolution
//!
//! Sources disagree on team naming ("Man Utd", "Manchester United FC",
//! "Manchester United"). Labels are resolved in three passes: exact
//! case-insensitive equality, a normalized comparison that canonicalizes
//! common club-name variants, then draw keywords. Anything ambiguous stays
//! unassigned.

use crate::models::{BookmakerQuote, Match, OutcomeSlot, SlotPrices};

/// Tokens marking the draw outcome
const DRAW_TOKENS: [&str; 4] = ["draw", "drawn", "tie", "tied"];

/// Club-type tokens dropped before comparison
const STRIPPED_TOKENS: [&str; 4] = ["fc", "afc", "cf", "sc"];

/// Variant spellings mapped onto one canonical token
const TOKEN_VARIANTS: [(&str, &str); 3] = [("united", "utd"), ("manchester", "man"), ("saint", "st")];

/// Canonical comparison form of a team name: lowercase, punctuation removed,
/// club suffixes stripped, variants canonicalized.
pub fn normalize_team_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace('&', " and ");

    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !STRIPPED_TOKENS.contains(token))
        .map(|token| {
            TOKEN_VARIANTS
                .iter()
                .find(|(variant, _)| *variant == token)
                .map(|(_, canonical)| *canonical)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive, whitespace-trimmed equality
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Whether two team names refer to the same club, exactly or after normalization
pub fn same_team(a: &str, b: &str) -> bool {
    if names_equal(a, b) {
        return true;
    }
    let a = normalize_team_name(a);
    !a.is_empty() && a == normalize_team_name(b)
}

/// Whether two matches are the same fixture, judged by team names only
pub fn same_fixture(a: &Match, b: &Match) -> bool {
    same_team(&a.home_team, &b.home_team) && same_team(&a.away_team, &b.away_team)
}

/// A draw keyword appears as a whole token of the normalized label
fn is_draw_label(normalized: &str) -> bool {
    normalized.split(' ').any(|token| DRAW_TOKENS.contains(&token))
}

/// Substring containment in either direction, on whole tokens
fn overlaps(label: &str, team: &str) -> bool {
    if label.is_empty() || team.is_empty() {
        return false;
    }
    let label = format!(" {label} ");
    let team = format!(" {team} ");
    label.contains(&team) || team.contains(&label)
}

/// Resolve an outcome label to a slot of the match. Returns `None` when the
/// label matches nothing or matches both teams.
pub fn match_slot(label: &str, m: &Match) -> Option<OutcomeSlot> {
    if label.trim().is_empty() {
        return None;
    }

    match (names_equal(label, &m.home_team), names_equal(label, &m.away_team)) {
        (true, false) => return Some(OutcomeSlot::Home),
        (false, true) => return Some(OutcomeSlot::Away),
        (true, true) => return None,
        (false, false) => {}
    }

    let normalized = normalize_team_name(label);
    let home_hit = overlaps(&normalized, &normalize_team_name(&m.home_team));
    let away_hit = overlaps(&normalized, &normalize_team_name(&m.away_team));

    match (home_hit, away_hit) {
        (true, false) => Some(OutcomeSlot::Home),
        (false, true) => Some(OutcomeSlot::Away),
        (true, true) => None,
        (false, false) if is_draw_label(&normalized) => Some(OutcomeSlot::Draw),
        (false, false) => None,
    }
}

/// Slot prices of one quote. Each slot takes the first outcome that resolves
/// to it; unresolvable labels are skipped.
pub fn resolve_quote(quote: &BookmakerQuote, m: &Match) -> SlotPrices {
    let mut prices = SlotPrices::default();
    for outcome in &quote.outcomes {
        if let Some(slot) = match_slot(&outcome.name, m) {
            if prices.get(slot).is_none() {
                prices.set(slot, Some(outcome.price));
            }
        }
    }
    prices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutcomePrice;
    use chrono::Utc;

    fn fixture(home: &str, away: &str) -> Match {
        Match::new(home, away, "soccer_epl", "EPL", Utc::now())
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let m = fixture("Arsenal", "Chelsea");
        assert_eq!(match_slot("  arsenal ", &m), Some(OutcomeSlot::Home));
        assert_eq!(match_slot("CHELSEA", &m), Some(OutcomeSlot::Away));
    }

    #[test]
    fn test_abbreviation_matches_via_normalization() {
        let m = fixture("Manchester United", "Liverpool");
        assert_eq!(match_slot("Man Utd", &m), Some(OutcomeSlot::Home));
        assert_eq!(match_slot("Manchester United FC", &m), Some(OutcomeSlot::Home));
        assert_eq!(match_slot("Liverpool FC", &m), Some(OutcomeSlot::Away));
    }

    #[test]
    fn test_draw_keywords() {
        let m = fixture("Arsenal", "Chelsea");
        assert_eq!(match_slot("Draw", &m), Some(OutcomeSlot::Draw));
        assert_eq!(match_slot("Drawn Match", &m), Some(OutcomeSlot::Draw));
        assert_eq!(match_slot("Tie", &m), Some(OutcomeSlot::Draw));
    }

    #[test]
    fn test_team_names_containing_draw_letters_are_not_draws() {
        let m = fixture("St Etienne", "Lyon");
        assert_eq!(match_slot("Saint-Etienne", &m), Some(OutcomeSlot::Home));

        let m = fixture("Tieton Tigers", "Drawbridge Rovers");
        assert_eq!(match_slot("Tieton Tigers FC", &m), Some(OutcomeSlot::Home));
        assert_eq!(match_slot("Drawbridge Rovers FC", &m), Some(OutcomeSlot::Away));
        assert_eq!(match_slot("Draw", &m), Some(OutcomeSlot::Draw));

        let m = fixture("Arsenal", "Chelsea");
        assert_eq!(match_slot("Tiebreak Town", &m), None);
    }

    #[test]
    fn test_ambiguous_label_is_unassigned() {
        let m = fixture("Manchester United", "Manchester City");
        assert_eq!(match_slot("Manchester", &m), None);
        assert_eq!(match_slot("Man City", &m), Some(OutcomeSlot::Away));
    }

    #[test]
    fn test_unknown_label_is_unassigned() {
        let m = fixture("Arsenal", "Chelsea");
        assert_eq!(match_slot("Tottenham", &m), None);
        assert_eq!(match_slot("", &m), None);
        assert_eq!(match_slot("FC", &m), None);
    }

    #[test]
    fn test_normalize_team_name() {
        assert_eq!(normalize_team_name("Brighton & Hove Albion"), "brighton and hove albion");
        assert_eq!(normalize_team_name("AFC Bournemouth"), "bournemouth");
        assert_eq!(normalize_team_name("St. Etienne"), "st etienne");
        assert_eq!(normalize_team_name("Saint Etienne"), "st etienne");
    }

    #[test]
    fn test_resolve_quote_first_match_wins() {
        let m = fixture("Arsenal", "Chelsea");
        let quote = BookmakerQuote::new(
            "book",
            "Book",
            vec![
                OutcomePrice::new("Arsenal", 1.8),
                OutcomePrice::new("Arsenal FC", 1.7),
                OutcomePrice::new("Over 2.5", 1.9),
                OutcomePrice::new("Chelsea", 4.2),
            ],
        );
        let prices = resolve_quote(&quote, &m);
        assert_eq!(prices.home, Some(1.8));
        assert_eq!(prices.away, Some(4.2));
        assert_eq!(prices.draw, None);
    }

    #[test]
    fn test_same_fixture_tolerates_naming_variants() {
        let a = fixture("Manchester United", "Wolverhampton Wanderers");
        let b = fixture("Man Utd FC", "wolverhampton wanderers");
        assert!(same_fixture(&a, &b));
        assert!(!same_fixture(&a, &fixture("Manchester City", "Wolverhampton Wanderers")));
    }
}
