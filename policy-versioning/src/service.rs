//! The version index.
//!
//! Every registered version is filed under three keys: its major, its
//! minor and its exact patch. A separate status map holds each version's
//! activation status. Both live behind one lock so a reader never sees a
//! version in one map but not the other.

use crate::query::VersionQuery;
use policy_types::{ActivationStatus, EntityInfo, PolicyVersion};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VersionKey {
    Major { name: String, major: u32 },
    Minor { name: String, major: u32, minor: u32 },
    Patch { name: String, major: u32, minor: u32, patch: u32 },
}

impl VersionKey {
    fn all_for(v: &PolicyVersion) -> [Self; 3] {
        let name = v.name().to_string();
        [
            Self::Major {
                name: name.clone(),
                major: v.major(),
            },
            Self::Minor {
                name: name.clone(),
                major: v.major(),
                minor: v.minor(),
            },
            Self::Patch {
                name,
                major: v.major(),
                minor: v.minor(),
                patch: v.patch(),
            },
        ]
    }

    fn for_query(name: &str, query: VersionQuery) -> Self {
        let name = name.to_string();
        match query {
            VersionQuery::Major(major) => Self::Major { name, major },
            VersionQuery::Minor(major, minor) => Self::Minor { name, major, minor },
            VersionQuery::Patch(major, minor, patch) => Self::Patch {
                name,
                major,
                minor,
                patch,
            },
        }
    }
}

#[derive(Debug, Default)]
struct Index {
    versions: HashMap<VersionKey, BTreeSet<PolicyVersion>>,
    status: HashMap<PolicyVersion, ActivationStatus>,
}

/// Answers "which version of policy N should serve version request G".
#[derive(Debug, Default)]
pub struct PolicyVersionService {
    index: RwLock<Index>,
}

impl PolicyVersionService {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Index> {
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers `info` at every granularity. Re-registering overwrites the
    /// status.
    pub fn set(&self, info: &EntityInfo, status: ActivationStatus) {
        let version = info.policy_version();
        let mut index = self.write();
        for key in VersionKey::all_for(&version) {
            index.versions.entry(key).or_default().insert(version.clone());
        }
        debug!(version = %version, %status, "Registered policy version");
        index.status.insert(version, status);
    }

    /// Registers `info` as the only patch of its `major.minor`. Other
    /// patches of the same minor are forgotten in the same write.
    pub fn replace(&self, info: &EntityInfo, status: ActivationStatus) {
        let version = info.policy_version();
        let mut index = self.write();
        let minor_key = VersionKey::Minor {
            name: version.name().to_string(),
            major: version.major(),
            minor: version.minor(),
        };
        let stale: Vec<PolicyVersion> = index
            .versions
            .get(&minor_key)
            .map(|set| set.iter().filter(|v| **v != version).cloned().collect())
            .unwrap_or_default();
        for old in &stale {
            Self::forget(&mut index, old);
            debug!(version = %old, replaced_by = %version, "Dropped replaced policy version");
        }
        for key in VersionKey::all_for(&version) {
            index.versions.entry(key).or_default().insert(version.clone());
        }
        debug!(version = %version, %status, "Registered policy version");
        index.status.insert(version, status);
    }

    /// Forgets `info`. Unknown versions are ignored.
    pub fn remove(&self, info: &EntityInfo) {
        let version = info.policy_version();
        let mut index = self.write();
        if Self::forget(&mut index, &version) {
            debug!(version = %version, "Removed policy version");
        }
    }

    fn forget(index: &mut Index, version: &PolicyVersion) -> bool {
        if index.status.remove(version).is_none() {
            return false;
        }
        for key in VersionKey::all_for(version) {
            if let Some(set) = index.versions.get_mut(&key) {
                set.remove(version);
                if set.is_empty() {
                    index.versions.remove(&key);
                }
            }
        }
        true
    }

    /// Resolves a version string. Unparsable input resolves to nothing.
    pub fn resolve(&self, name: &str, version: &str) -> Option<PolicyVersion> {
        let query = version.parse().ok()?;
        self.resolve_query(name, query)
    }

    /// Pinned queries (`major.minor`, `major.minor.patch`) take the highest
    /// patch and accept ACTIVE or AVAILABLE. Major-only queries take the
    /// highest minor whose highest patch is ACTIVE.
    pub fn resolve_query(&self, name: &str, query: VersionQuery) -> Option<PolicyVersion> {
        let index = self.read();
        let candidates = index.versions.get(&VersionKey::for_query(name, query))?;
        let status_of = |v: &PolicyVersion| index.status.get(v).copied();

        match query {
            VersionQuery::Minor(..) | VersionQuery::Patch(..) => {
                let newest = candidates.iter().max_by_key(|v| v.patch())?;
                status_of(newest)
                    .filter(|s| s.is_pinnable())
                    .map(|_| newest.clone())
            }
            VersionQuery::Major(_) => {
                let mut newest_per_minor: BTreeMap<u32, &PolicyVersion> = BTreeMap::new();
                for v in candidates {
                    newest_per_minor
                        .entry(v.minor())
                        .and_modify(|cur| {
                            if v.patch() > cur.patch() {
                                *cur = v;
                            }
                        })
                        .or_insert(v);
                }
                newest_per_minor
                    .into_values()
                    .rev()
                    .find(|v| status_of(*v) == Some(ActivationStatus::Active))
                    .cloned()
            }
        }
    }

    /// Status of an exact version, if registered.
    pub fn status(&self, version: &PolicyVersion) -> Option<ActivationStatus> {
        self.read().status.get(version).copied()
    }

    /// Number of registered versions.
    pub fn len(&self) -> usize {
        self.read().status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
