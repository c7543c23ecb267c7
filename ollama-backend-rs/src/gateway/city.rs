//! Best-effort main-city inference for trip extraction
//!
//! Used only when the model left `city` empty. Strategies run in rank order:
//! 1. majority vote over the capitalized prefix of each item's location
//! 2. a travel phrase ("visiting Paris", "trip to New York") in the source text
//! 3. on an unresolved tie, the tied candidate seen first

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder location written by item normalization
pub const UNKNOWN_LOCATION: &str = "Unknown";

static LOCATION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)").expect("location prefix pattern is valid")
});

static TRAVEL_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:in|to|visit|visiting|explore|exploring)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)")
        .expect("travel phrase pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum LocationVote {
    Winner(String),
    Tie(Vec<String>),
    NoCandidates,
}

/// Capitalized leading word or word pair of a location, e.g. "New York" from "New York, USA"
pub fn location_prefix(location: &str) -> Option<&str> {
    let trimmed = location.trim_start();
    LOCATION_PREFIX
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// First capitalized place named after a travel verb or preposition
pub fn city_from_text(text: &str) -> Option<String> {
    TRAVEL_PHRASE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|city| !city.is_empty())
}

fn vote_on_locations<'a>(locations: impl IntoIterator<Item = &'a str>) -> LocationVote {
    // first-seen order is kept so ties resolve deterministically
    let mut tally: Vec<(&'a str, usize)> = Vec::new();

    for location in locations {
        if location.trim() == UNKNOWN_LOCATION {
            continue;
        }
        if let Some(prefix) = location_prefix(location) {
            match tally.iter_mut().find(|(name, _)| *name == prefix) {
                Some((_, count)) => *count += 1,
                None => tally.push((prefix, 1)),
            }
        }
    }

    let Some(best) = tally.iter().map(|(_, count)| *count).max() else {
        return LocationVote::NoCandidates;
    };

    let mut leaders: Vec<String> = tally
        .into_iter()
        .filter(|(_, count)| *count == best)
        .map(|(name, _)| name.to_string())
        .collect();

    if leaders.len() == 1 {
        LocationVote::Winner(leaders.remove(0))
    } else {
        LocationVote::Tie(leaders)
    }
}

/// Infer the trip's main city from item locations, falling back to the source text.
pub fn infer_city<'a>(
    locations: impl IntoIterator<Item = &'a str>,
    source_text: &str,
) -> Option<String> {
    match vote_on_locations(locations) {
        LocationVote::Winner(city) => Some(city),
        LocationVote::Tie(leaders) => {
            city_from_text(source_text).or_else(|| leaders.into_iter().next())
        }
        LocationVote::NoCandidates => city_from_text(source_text),
    }
}
