#![allow(dead_code)]

use policy_loading::{EntityLoadEvent, LoadError, LoadOperationResult, PolicyLoadTarget};
use policy_types::{Entity, EntityInfo, LogicalId, PatchIdentifier, PolicyEntity};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn make_info(name: &str, major: u32, minor: u32, patch: u32) -> EntityInfo {
    EntityInfo::policy(name, major, minor, patch)
}

pub fn make_policy(info: EntityInfo) -> Entity {
    let metadata = format!("{}policy-metadata.json", info.location_prefix());
    PolicyEntity::new(info)
        .with_item(metadata, r#"{"Status": "ACTIVE"}"#)
        .into()
}

/// Polls `cond` until it holds, yielding to other tasks in between.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Lets spawned tasks run for a while without asserting anything.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn operations(events: &[EntityLoadEvent]) -> Vec<&LoadOperationResult> {
    events
        .iter()
        .filter_map(|e| match e {
            EntityLoadEvent::Operation(op) => Some(op),
            EntityLoadEvent::NonLoading(_) => None,
        })
        .collect()
}

/// `true` for a terminal marker, `false` for a store error.
pub fn non_loading(events: &[EntityLoadEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            EntityLoadEvent::NonLoading(n) => Some(n.is_terminal()),
            EntityLoadEvent::Operation(_) => None,
        })
        .collect()
}

/// In-memory load target with scripted failures.
#[derive(Debug, Default)]
pub struct ScriptedTarget {
    latest: Mutex<BTreeMap<LogicalId, EntityInfo>>,
    failing: Mutex<HashSet<PatchIdentifier>>,
    panicking: Mutex<HashSet<PatchIdentifier>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, info: &EntityInfo) {
        self.failing.lock().unwrap().insert(info.patch_identifier());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn panic_on(&self, info: &EntityInfo) {
        self.panicking.lock().unwrap().insert(info.patch_identifier());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_loaded(&self, info: &EntityInfo) -> bool {
        self.latest
            .lock()
            .unwrap()
            .get(&info.logical_id())
            .is_some_and(|l| l == info)
    }
}

impl PolicyLoadTarget for ScriptedTarget {
    fn load(&self, entity: &Entity) -> Result<(), LoadError> {
        let info = entity.info();
        let patch_id = info.patch_identifier();
        self.calls.lock().unwrap().push(format!("load {patch_id}"));
        if self.panicking.lock().unwrap().contains(&patch_id) {
            panic!("scripted panic for {patch_id}");
        }
        if self.failing.lock().unwrap().contains(&patch_id) {
            return Err(LoadError::RuleEngine(format!("scripted failure for {patch_id}")));
        }
        self.latest
            .lock()
            .unwrap()
            .insert(info.logical_id(), info.without_priors());
        Ok(())
    }

    fn unload(&self, info: &EntityInfo) -> Result<(), LoadError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("unload {}", info.patch_identifier()));
        let mut latest = self.latest.lock().unwrap();
        if latest.get(&info.logical_id()) == Some(info) {
            latest.remove(&info.logical_id());
        }
        Ok(())
    }

    fn loaded_entities(&self) -> Vec<EntityInfo> {
        let mut infos: Vec<EntityInfo> = self.latest.lock().unwrap().values().cloned().collect();
        infos.sort_by(|a, b| a.location_prefix().cmp(b.location_prefix()));
        infos
    }
}
