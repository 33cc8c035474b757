//! Policy content items and metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// File name of the metadata document inside a policy.
pub const METADATA_FILE_NAME: &str = "policy-metadata.json";

/// Lifecycle flag controlling version-resolution eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationStatus {
    /// Fully released; eligible at every granularity.
    #[default]
    Active,
    /// Soft-launched; only eligible when pinned to `major.minor` or finer.
    Available,
    /// Never eligible.
    Disabled,
}

impl ActivationStatus {
    /// Eligible when the caller pinned a minor or patch version.
    pub const fn is_pinnable(self) -> bool {
        matches!(self, Self::Active | Self::Available)
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::Available => "AVAILABLE",
            Self::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}

/// Contents of `policy-metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMetadata {
    #[serde(rename = "Status", default)]
    pub status: ActivationStatus,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
}

/// One raw file from a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub path: String,
    pub content: String,
}

impl ContentItem {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}
