//! Entity identities and realized entities.

use crate::content::{ActivationStatus, ContentItem, PolicyMetadata, METADATA_FILE_NAME};
use crate::version::{LogicalId, PatchIdentifier, PolicyVersion};
use crate::{ContentError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Kind of artifact a store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Policy,
    Process,
    Other,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Policy => "policy",
            Self::Process => "process",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Identity of one versioned artifact.
///
/// Equality and hashing cover the identity fields only; the prior-version
/// list is fallback metadata and never distinguishes two infos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInfo {
    entity_type: EntityType,
    name: String,
    major: u32,
    minor: u32,
    patch: u32,
    location_prefix: String,
    /// Newest first. Never contains `self`.
    #[serde(default)]
    prior_versions: Vec<EntityInfo>,
}

impl EntityInfo {
    /// Creates an info whose location prefix is derived from name and version.
    #[must_use]
    pub fn new(entity_type: EntityType, name: impl Into<String>, major: u32, minor: u32, patch: u32) -> Self {
        let name = name.into();
        let location_prefix = format!("{name}/{major}.{minor}.{patch}/");
        Self {
            entity_type,
            name,
            major,
            minor,
            patch,
            location_prefix,
            prior_versions: Vec::new(),
        }
    }

    /// Shorthand for a policy info.
    #[must_use]
    pub fn policy(name: impl Into<String>, major: u32, minor: u32, patch: u32) -> Self {
        Self::new(EntityType::Policy, name, major, minor, patch)
    }

    #[must_use]
    pub fn with_location_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location_prefix = prefix.into();
        self
    }

    /// Sets the fallback chain, newest first. Nested chains on the given
    /// infos are dropped so the list stays flat and acyclic.
    #[must_use]
    pub fn with_prior_versions(mut self, priors: impl IntoIterator<Item = EntityInfo>) -> Self {
        let me = self.without_priors();
        self.prior_versions = priors
            .into_iter()
            .map(|p| p.without_priors())
            .filter(|p| *p != me)
            .collect();
        self
    }

    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
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

    pub fn location_prefix(&self) -> &str {
        &self.location_prefix
    }

    pub fn prior_versions(&self) -> &[EntityInfo] {
        &self.prior_versions
    }

    /// `major.minor.patch`
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    #[must_use]
    pub fn logical_id(&self) -> LogicalId {
        LogicalId::new(&self.name, self.major, self.minor)
    }

    #[must_use]
    pub fn patch_identifier(&self) -> PatchIdentifier {
        PatchIdentifier::new(&self.name, self.major, self.minor, self.patch)
    }

    #[must_use]
    pub fn policy_version(&self) -> PolicyVersion {
        PolicyVersion::new(self.name.clone(), self.major, self.minor, self.patch)
    }

    /// This info followed by its prior versions, newest first.
    pub fn version_chain(&self) -> impl Iterator<Item = &EntityInfo> {
        std::iter::once(self).chain(self.prior_versions.iter())
    }

    /// A copy of this identity with an empty fallback chain.
    #[must_use]
    pub fn without_priors(&self) -> Self {
        Self {
            entity_type: self.entity_type,
            name: self.name.clone(),
            major: self.major,
            minor: self.minor,
            patch: self.patch,
            location_prefix: self.location_prefix.clone(),
            prior_versions: Vec::new(),
        }
    }
}

impl PartialEq for EntityInfo {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.name == other.name
            && self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.location_prefix == other.location_prefix
    }
}

impl Eq for EntityInfo {}

impl Hash for EntityInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.name.hash(state);
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.location_prefix.hash(state);
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}.{}.{}",
            self.entity_type, self.name, self.major, self.minor, self.patch
        )
    }
}

/// A policy entity: identity plus raw content items keyed by store path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntity {
    info: EntityInfo,
    items: BTreeMap<String, String>,
}

impl PolicyEntity {
    #[must_use]
    pub fn new(info: EntityInfo) -> Self {
        Self {
            info,
            items: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_item(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.items.insert(path.into(), content.into());
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = ContentItem>) -> Self {
        for item in items {
            self.items.insert(item.path, item.content);
        }
        self
    }

    pub fn info(&self) -> &EntityInfo {
        &self.info
    }

    pub fn item(&self, path: &str) -> Option<&str> {
        self.items.get(path).map(String::as_str)
    }

    /// All items in path order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses `policy-metadata.json`. A policy without one is treated as
    /// active with no declared type.
    pub fn metadata(&self) -> Result<PolicyMetadata> {
        match self
            .items
            .iter()
            .find(|(path, _)| file_name(path) == METADATA_FILE_NAME)
        {
            Some((path, raw)) => serde_json::from_str(raw).map_err(|source| ContentError::Metadata {
                path: path.clone(),
                source,
            }),
            None => Ok(PolicyMetadata::default()),
        }
    }

    pub fn activation_status(&self) -> Result<ActivationStatus> {
        Ok(self.metadata()?.status)
    }

    /// Documents under a `config/` directory, as `(file name, content)`.
    pub fn config_documents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .filter(|(path, _)| parent_dir(path) == Some("config"))
            .map(|(path, content)| (file_name(path), content.as_str()))
    }

    /// Items under a `rules/` directory, as `(store path, content)`.
    pub fn rule_items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .filter(|(path, _)| parent_dir(path) == Some("rules"))
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    /// SHA-256 over every `(path, content)` pair in path order, hex encoded.
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (path, content) in &self.items {
            hasher.update((path.len() as u64).to_le_bytes());
            hasher.update(path.as_bytes());
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(content.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

fn parent_dir(path: &str) -> Option<&str> {
    let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
    segments.next()?;
    segments.next()
}

/// A realized entity as delivered by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Policy(PolicyEntity),
    /// Any entity kind the policy runtime does not understand.
    Other { info: EntityInfo },
}

impl Entity {
    pub fn info(&self) -> &EntityInfo {
        match self {
            Self::Policy(p) => p.info(),
            Self::Other { info } => info,
        }
    }

    pub fn as_policy(&self) -> Option<&PolicyEntity> {
        match self {
            Self::Policy(p) => Some(p),
            Self::Other { .. } => None,
        }
    }
}

impl From<PolicyEntity> for Entity {
    fn from(p: PolicyEntity) -> Self {
        Self::Policy(p)
    }
}
