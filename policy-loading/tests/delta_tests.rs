use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use policy_loading::{ConfigStore, DeltaConfigStore, EntityDelta, EntityDeltaSource, StoreError, StoreResult};
use policy_types::{ChangeNotification, ChangeType, Entity, EntityInfo, EntityType, PolicyEntity};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ScriptedSource {
    entities: Vec<EntityInfo>,
    batches: Mutex<Vec<StoreResult<Vec<EntityDelta>>>>,
    missing: Vec<EntityInfo>,
    fetches: Mutex<Vec<EntityInfo>>,
}

#[async_trait]
impl EntityDeltaSource for ScriptedSource {
    async fn list(&self, _types: &[EntityType]) -> StoreResult<Vec<EntityInfo>> {
        Ok(self.entities.clone())
    }

    async fn fetch(&self, info: &EntityInfo) -> StoreResult<Entity> {
        self.fetches.lock().unwrap().push(info.clone());
        if self.missing.contains(info) {
            return Err(StoreError::NotFound(info.to_string()));
        }
        Ok(PolicyEntity::new(info.clone()).into())
    }

    fn deltas(&self, _known: Vec<EntityInfo>, _types: &[EntityType]) -> BoxStream<'static, StoreResult<Vec<EntityDelta>>> {
        let batches = std::mem::take(&mut *self.batches.lock().unwrap());
        stream::iter(batches).boxed()
    }
}

fn info(name: &str) -> EntityInfo {
    EntityInfo::policy(name, 1, 0, 0)
}

#[tokio::test]
async fn deltas_are_realized_in_order() {
    let source = Arc::new(ScriptedSource {
        batches: Mutex::new(vec![Ok(vec![
            EntityDelta::new(ChangeType::Add, info("a")),
            EntityDelta::new(ChangeType::Delete, info("b")),
            EntityDelta::new(ChangeType::Update, info("c")),
        ])]),
        ..Default::default()
    });
    let store = DeltaConfigStore::new(source.clone());

    let batches: Vec<_> = store
        .stream_change_batches(Vec::new(), &[EntityType::Policy])
        .collect()
        .await;

    assert_eq!(batches.len(), 1);
    let batch = batches[0].as_ref().unwrap();
    let kinds: Vec<ChangeType> = batch.iter().map(ChangeNotification::change_type).collect();
    assert_eq!(kinds, vec![ChangeType::Add, ChangeType::Delete, ChangeType::Update]);
    assert_eq!(*source.fetches.lock().unwrap(), vec![info("a"), info("c")]);
}

#[tokio::test]
async fn fetch_failure_fails_the_batch() {
    let source = Arc::new(ScriptedSource {
        batches: Mutex::new(vec![
            Ok(vec![EntityDelta::new(ChangeType::Add, info("gone"))]),
            Ok(vec![EntityDelta::new(ChangeType::Add, info("here"))]),
        ]),
        missing: vec![info("gone")],
        ..Default::default()
    });
    let store = DeltaConfigStore::new(source);

    let batches: Vec<_> = store
        .stream_change_batches(Vec::new(), &[EntityType::Policy])
        .collect()
        .await;

    assert!(matches!(batches[0], Err(StoreError::NotFound(_))));
    assert!(batches[1].is_ok());
}

#[tokio::test]
async fn load_all_fetches_every_listed_entity() {
    let source = Arc::new(ScriptedSource {
        entities: vec![info("a"), info("b")],
        ..Default::default()
    });
    let store = DeltaConfigStore::new(source);

    let entities = store.load_all(&[EntityType::Policy]).await.unwrap();
    let names: Vec<&str> = entities.iter().map(|e| e.info().name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(store.list_entity_info(&[EntityType::Policy]).await.unwrap().len(), 2);
}
