//! Business-event matching strategies.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of matching a business event against a policy's use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSelection {
    /// Apply the use case at this index of the supplied key list.
    UseCase(usize),
    /// No use case applies, but the defaults do.
    DefaultsOnly,
    /// Nothing applies.
    NoMatch,
}

/// Selects a use case for a business event.
///
/// Implementations see use-case keys in a stable order and must be
/// deterministic for a given input.
pub trait ConfigMatchingStrategy: Send + Sync + fmt::Debug {
    fn select(&self, business_event: &str, use_cases: &[&str]) -> ConfigSelection;
}

/// Built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategies {
    /// Dot-separated segments are compared pairwise and empty event
    /// segments match anything. Falls back to the defaults.
    #[default]
    MatchAllNonNull,
    /// The business event must equal a use-case key.
    MatchExactOnly,
}

impl ConfigMatchingStrategy for MatchingStrategies {
    fn select(&self, business_event: &str, use_cases: &[&str]) -> ConfigSelection {
        if let Some(idx) = use_cases.iter().position(|k| *k == business_event) {
            return ConfigSelection::UseCase(idx);
        }
        match self {
            Self::MatchExactOnly => ConfigSelection::NoMatch,
            Self::MatchAllNonNull => use_cases
                .iter()
                .position(|k| segments_match(business_event, k))
                .map_or(ConfigSelection::DefaultsOnly, ConfigSelection::UseCase),
        }
    }
}

fn segments_match(event: &str, key: &str) -> bool {
    let event: Vec<&str> = event.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    if event.len() != key.len() || event.iter().all(|s| s.is_empty()) {
        return false;
    }
    event
        .iter()
        .zip(&key)
        .all(|(e, k)| e.is_empty() || e == k)
}

impl fmt::Display for MatchingStrategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchAllNonNull => f.write_str("match_all_non_null"),
            Self::MatchExactOnly => f.write_str("match_exact_only"),
        }
    }
}

impl FromStr for MatchingStrategies {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "match_all_non_null" => Ok(Self::MatchAllNonNull),
            "match_exact_only" => Ok(Self::MatchExactOnly),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &[&str] = &["A.A.A.A", "B.B.B.B"];

    #[test]
    fn exact_match_wins_for_both() {
        for s in [MatchingStrategies::MatchAllNonNull, MatchingStrategies::MatchExactOnly] {
            assert_eq!(s.select("B.B.B.B", KEYS), ConfigSelection::UseCase(1));
        }
    }

    #[test]
    fn empty_segments_are_wildcards() {
        let s = MatchingStrategies::MatchAllNonNull;
        assert_eq!(s.select("A..A.", KEYS), ConfigSelection::UseCase(0));
        assert_eq!(s.select("...B", KEYS), ConfigSelection::UseCase(1));
    }

    #[test]
    fn all_empty_or_wrong_arity_falls_back() {
        let s = MatchingStrategies::MatchAllNonNull;
        assert_eq!(s.select("", KEYS), ConfigSelection::DefaultsOnly);
        assert_eq!(s.select("...", KEYS), ConfigSelection::DefaultsOnly);
        assert_eq!(s.select("A.A", KEYS), ConfigSelection::DefaultsOnly);
        assert_eq!(s.select("W.X.Y.Z", KEYS), ConfigSelection::DefaultsOnly);
    }

    #[test]
    fn exact_only_never_falls_back() {
        let s = MatchingStrategies::MatchExactOnly;
        assert_eq!(s.select("", KEYS), ConfigSelection::NoMatch);
        assert_eq!(s.select("A..A.", KEYS), ConfigSelection::NoMatch);
    }

    #[test]
    fn parse_names() {
        assert_eq!("match-exact-only".parse::<MatchingStrategies>().unwrap(), MatchingStrategies::MatchExactOnly);
        assert_eq!("MATCH_ALL_NON_NULL".parse::<MatchingStrategies>().unwrap(), MatchingStrategies::MatchAllNonNull);
        assert!("fuzzy".parse::<MatchingStrategies>().is_err());
    }
}
