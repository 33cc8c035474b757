//! Store abstraction.
//!
//! A store lists entity identities, fetches realized entities, and streams
//! change batches describing how its contents drift from a known set.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use policy_types::{ChangeNotification, Entity, EntityInfo, EntityType};

/// Stream of change batches. Restartable: each call to
/// [`ConfigStore::stream_change_batches`] is a fresh subscription.
pub type ChangeBatchStream = BoxStream<'static, StoreResult<Vec<ChangeNotification>>>;

/// Source of truth for policy artifacts.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Lists every entity of the given types currently in the store.
    async fn list_entity_info(&self, types: &[EntityType]) -> StoreResult<Vec<EntityInfo>>;

    /// Fetches the realized content for `info`.
    async fn fetch_entity(&self, info: &EntityInfo) -> StoreResult<Entity>;

    /// Subscribes to changes relative to `known`, which the caller sorts by
    /// location prefix.
    fn stream_change_batches(&self, known: Vec<EntityInfo>, types: &[EntityType]) -> ChangeBatchStream;
}

/// A store with nothing in it whose change stream never yields.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyConfigStore;

#[async_trait]
impl ConfigStore for EmptyConfigStore {
    async fn list_entity_info(&self, _types: &[EntityType]) -> StoreResult<Vec<EntityInfo>> {
        Ok(Vec::new())
    }

    async fn fetch_entity(&self, info: &EntityInfo) -> StoreResult<Entity> {
        Err(StoreError::NotFound(info.to_string()))
    }

    fn stream_change_batches(&self, _known: Vec<EntityInfo>, _types: &[EntityType]) -> ChangeBatchStream {
        stream::pending::<StoreResult<Vec<ChangeNotification>>>().boxed()
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    type BatchReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<StoreResult<Vec<ChangeNotification>>>>>;

    /// In-memory store whose change stream is fed by the test.
    ///
    /// All subscriptions share one queue, so a resubscription continues
    /// where the previous one stopped. Closing the queue completes the
    /// stream.
    #[derive(Debug)]
    pub struct MockConfigStore {
        entities: Mutex<HashMap<EntityInfo, Entity>>,
        failing_fetches: Mutex<HashSet<EntityInfo>>,
        list_error: Mutex<Option<StoreError>>,
        subscriptions: Mutex<Vec<Vec<EntityInfo>>>,
        sender: Mutex<Option<mpsc::UnboundedSender<StoreResult<Vec<ChangeNotification>>>>>,
        receiver: BatchReceiver,
    }

    impl Default for MockConfigStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockConfigStore {
        pub fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                entities: Mutex::new(HashMap::new()),
                failing_fetches: Mutex::new(HashSet::new()),
                list_error: Mutex::new(None),
                subscriptions: Mutex::new(Vec::new()),
                sender: Mutex::new(Some(tx)),
                receiver: Arc::new(tokio::sync::Mutex::new(rx)),
            }
        }

        /// Adds or replaces an entity. Listing returns its info including
        /// any prior versions.
        pub fn insert(&self, entity: impl Into<Entity>) {
            let entity = entity.into();
            let mut entities = lock(&self.entities);
            entities.remove(entity.info());
            entities.insert(entity.info().clone(), entity);
        }

        pub fn remove(&self, info: &EntityInfo) {
            lock(&self.entities).remove(info);
        }

        /// Makes `fetch_entity` fail for `info`.
        pub fn fail_fetch(&self, info: EntityInfo) {
            lock(&self.failing_fetches).insert(info);
        }

        /// Makes the next `list_entity_info` call fail.
        pub fn fail_next_list(&self, error: StoreError) {
            *lock(&self.list_error) = Some(error);
        }

        pub fn push_batch(&self, batch: Vec<ChangeNotification>) {
            self.send(Ok(batch));
        }

        pub fn push_error(&self, error: StoreError) {
            self.send(Err(error));
        }

        /// Completes the change stream once queued items drain.
        pub fn close(&self) {
            lock(&self.sender).take();
        }

        /// The `known` list of every subscription so far.
        pub fn subscriptions(&self) -> Vec<Vec<EntityInfo>> {
            lock(&self.subscriptions).clone()
        }

        fn send(&self, item: StoreResult<Vec<ChangeNotification>>) {
            if let Some(tx) = lock(&self.sender).as_ref() {
                let _ = tx.send(item);
            }
        }
    }

    fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[async_trait]
    impl ConfigStore for MockConfigStore {
        async fn list_entity_info(&self, types: &[EntityType]) -> StoreResult<Vec<EntityInfo>> {
            if let Some(err) = lock(&self.list_error).take() {
                return Err(err);
            }
            let mut infos: Vec<EntityInfo> = lock(&self.entities)
                .values()
                .map(Entity::info)
                .filter(|info| types.contains(&info.entity_type()))
                .cloned()
                .collect();
            infos.sort_by(|a, b| a.location_prefix().cmp(b.location_prefix()));
            Ok(infos)
        }

        async fn fetch_entity(&self, info: &EntityInfo) -> StoreResult<Entity> {
            if lock(&self.failing_fetches).contains(info) {
                return Err(StoreError::Connectivity(format!("fetch failed for {info}")));
            }
            lock(&self.entities)
                .get(info)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(info.to_string()))
        }

        fn stream_change_batches(&self, known: Vec<EntityInfo>, _types: &[EntityType]) -> ChangeBatchStream {
            lock(&self.subscriptions).push(known);
            let receiver = Arc::clone(&self.receiver);
            stream::unfold(receiver, |rx| async move {
                let next = rx.lock().await.recv().await;
                next.map(|item| (item, rx))
            })
            .boxed()
        }
    }
}
