//! Requested-version parsing.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Granularity a caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionQuery {
    /// `"2"`: float to the newest active minor.
    Major(u32),
    /// `"2.1"`: newest patch of that minor.
    Minor(u32, u32),
    /// `"2.1.3"`: exactly that patch.
    Patch(u32, u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{0}': expected <major>, <major>.<minor> or <major>.<minor>.<patch>")]
pub struct InvalidVersion(pub String);

impl FromStr for VersionQuery {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major] => Ok(Self::Major(*major)),
            [major, minor] => Ok(Self::Minor(*major, *minor)),
            [major, minor, patch] => Ok(Self::Patch(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for VersionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major(major) => write!(f, "{major}"),
            Self::Minor(major, minor) => write!(f, "{major}.{minor}"),
            Self::Patch(major, minor, patch) => write!(f, "{major}.{minor}.{patch}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_granularity() {
        assert_eq!("3".parse(), Ok(VersionQuery::Major(3)));
        assert_eq!("3.1".parse(), Ok(VersionQuery::Minor(3, 1)));
        assert_eq!(" 3.1.4 ".parse(), Ok(VersionQuery::Patch(3, 1, 4)));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "1.", "a.b", "1.2.3.4", "-1", "1..2"] {
            assert!(bad.parse::<VersionQuery>().is_err(), "{bad} should not parse");
        }
    }
}
