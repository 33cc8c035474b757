//! Version value objects and the keys derived from them.
//!
//! A *logical id* (`name/major.minor`) names one policy line. A *patch
//! identifier* (`name/major.minor.patch`) names one loadable unit.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A fully qualified policy version, as stored in and returned by the
/// version index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyVersion {
    name: String,
    major: u32,
    minor: u32,
    patch: u32,
}

impl PolicyVersion {
    #[must_use]
    pub fn new(name: impl Into<String>, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
            patch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn major(&self) -> u32 {
        self.major
    }

    pub const fn minor(&self) -> u32 {
        self.minor
    }

    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// `major.minor.patch`
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    #[must_use]
    pub fn patch_identifier(&self) -> PatchIdentifier {
        PatchIdentifier::new(&self.name, self.major, self.minor, self.patch)
    }

    #[must_use]
    pub fn logical_id(&self) -> LogicalId {
        LogicalId::new(&self.name, self.major, self.minor)
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then(self.major.cmp(&other.major))
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}.{}", self.name, self.major, self.minor, self.patch)
    }
}

/// Unit of load/unload granularity: `name/major.minor.patch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchIdentifier(String);

impl PatchIdentifier {
    #[must_use]
    pub fn new(name: &str, major: u32, minor: u32, patch: u32) -> Self {
        Self(format!("{name}/{major}.{minor}.{patch}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatchIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One policy line regardless of patch: `name/major.minor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    #[must_use]
    pub fn new(name: &str, major: u32, minor: u32) -> Self {
        Self(format!("{name}/{major}.{minor}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
