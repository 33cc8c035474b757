//! Per-patch bookkeeping shared by the runtime flavors.
//!
//! Content is keyed by patch identifier. Each logical id additionally
//! records which patch was loaded last, together with the digest of the
//! content it was loaded from. Both maps sit behind one lock, so an
//! invocation observes either the state before a load or the state after
//! it, never a mix.

use policy_types::{EntityInfo, LogicalId, PatchIdentifier};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Latest {
    info: EntityInfo,
    digest: String,
}

#[derive(Debug)]
struct Slots<T> {
    patches: HashMap<PatchIdentifier, Arc<T>>,
    latest: HashMap<LogicalId, Latest>,
}

/// A patch that was displaced by a newer load of the same logical id.
#[derive(Debug)]
pub struct Displaced<T> {
    pub info: EntityInfo,
    pub content: Arc<T>,
}

#[derive(Debug)]
pub struct PatchRegistry<T> {
    slots: RwLock<Slots<T>>,
}

impl<T> Default for PatchRegistry<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Slots {
                patches: HashMap::new(),
                latest: HashMap::new(),
            }),
        }
    }
}

impl<T> PatchRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots<T>> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots<T>> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }

    /// `true` when `info` is already the latest patch of its logical id and
    /// was loaded from content with the same digest.
    pub fn is_current(&self, info: &EntityInfo, digest: &str) -> bool {
        self.read()
            .latest
            .get(&info.logical_id())
            .is_some_and(|l| l.info.patch_identifier() == info.patch_identifier() && l.digest == digest)
    }

    pub fn get(&self, id: &PatchIdentifier) -> Option<Arc<T>> {
        self.read().patches.get(id).cloned()
    }

    pub fn contains(&self, id: &PatchIdentifier) -> bool {
        self.read().patches.contains_key(id)
    }

    /// Installs `content` for `info` and makes it the latest patch of its
    /// logical id.
    ///
    /// When the logical id previously pointed at a different patch, that
    /// patch's content is dropped from the registry in the same write and
    /// handed back so the caller can release anything it holds outside.
    pub fn install(&self, info: &EntityInfo, digest: String, content: T) -> Option<Displaced<T>> {
        let patch_id = info.patch_identifier();
        let mut slots = self.write();
        slots.patches.insert(patch_id.clone(), Arc::new(content));
        let previous = slots.latest.insert(
            info.logical_id(),
            Latest {
                info: info.without_priors(),
                digest,
            },
        )?;

        let previous_id = previous.info.patch_identifier();
        if previous_id == patch_id {
            return None;
        }
        let content = slots.patches.remove(&previous_id)?;
        Some(Displaced {
            info: previous.info,
            content,
        })
    }

    /// Removes `info` if it is the latest patch of its logical id. Any other
    /// patch leaves the registry untouched.
    pub fn remove_if_latest(&self, info: &EntityInfo) -> Option<Arc<T>> {
        let patch_id = info.patch_identifier();
        let logical_id = info.logical_id();
        let mut slots = self.write();
        let is_latest = slots
            .latest
            .get(&logical_id)
            .is_some_and(|l| l.info.patch_identifier() == patch_id);
        if !is_latest {
            return None;
        }
        slots.latest.remove(&logical_id);
        slots.patches.remove(&patch_id)
    }

    /// Latest patch of every logical id, sorted by location prefix.
    pub fn loaded_entities(&self) -> Vec<EntityInfo> {
        let mut infos: Vec<EntityInfo> = self.read().latest.values().map(|l| l.info.clone()).collect();
        infos.sort_by(|a, b| a.location_prefix().cmp(b.location_prefix()));
        infos
    }

    pub fn len(&self) -> usize {
        self.read().patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(patch: u32) -> EntityInfo {
        EntityInfo::policy("a/b", 1, 0, patch)
    }

    #[test]
    fn reinstalling_same_patch_displaces_nothing() {
        let registry = PatchRegistry::new();
        assert!(registry.install(&info(0), "d1".into(), 1).is_none());
        assert!(registry.install(&info(0), "d2".into(), 2).is_none());
        assert_eq!(registry.get(&info(0).patch_identifier()).as_deref(), Some(&2));
        assert!(registry.is_current(&info(0), "d2"));
        assert!(!registry.is_current(&info(0), "d1"));
    }

    #[test]
    fn newer_patch_displaces_older() {
        let registry = PatchRegistry::new();
        registry.install(&info(0), "d".into(), 1);
        let displaced = registry.install(&info(1), "d".into(), 2).map(|d| d.info);

        assert_eq!(displaced, Some(info(0)));
        assert!(!registry.contains(&info(0).patch_identifier()));
        assert_eq!(registry.loaded_entities(), vec![info(1)]);
    }

    #[test]
    fn only_latest_is_removed() {
        let registry = PatchRegistry::new();
        registry.install(&info(1), "d".into(), 1);

        assert!(registry.remove_if_latest(&info(0)).is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_if_latest(&info(1)).is_some());
        assert!(registry.is_empty());
        assert!(registry.loaded_entities().is_empty());
    }
}
