//! Adapter from identity-only delta sources to a full [`ConfigStore`].
//!
//! Many stores can only report *which* entities changed. The adapter
//! fetches the content of every added or updated entity, in order, before
//! handing the batch to the load manager.

use crate::error::StoreResult;
use crate::store::{ChangeBatchStream, ConfigStore};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use policy_types::{ChangeNotification, ChangeType, Entity, EntityInfo, EntityType};
use std::sync::Arc;
use tracing::debug;

/// One identity-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDelta {
    pub change_type: ChangeType,
    pub info: EntityInfo,
}

impl EntityDelta {
    pub fn new(change_type: ChangeType, info: EntityInfo) -> Self {
        Self { change_type, info }
    }
}

/// A store that reports identity-level deltas.
#[async_trait]
pub trait EntityDeltaSource: Send + Sync + 'static {
    async fn list(&self, types: &[EntityType]) -> StoreResult<Vec<EntityInfo>>;

    async fn fetch(&self, info: &EntityInfo) -> StoreResult<Entity>;

    fn deltas(&self, known: Vec<EntityInfo>, types: &[EntityType]) -> BoxStream<'static, StoreResult<Vec<EntityDelta>>>;
}

/// [`ConfigStore`] over an [`EntityDeltaSource`].
#[derive(Debug)]
pub struct DeltaConfigStore<S> {
    source: Arc<S>,
}

impl<S: EntityDeltaSource> DeltaConfigStore<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Lists and fetches every entity of `types`.
    pub async fn load_all(&self, types: &[EntityType]) -> StoreResult<Vec<Entity>> {
        let infos = self.source.list(types).await?;
        let mut entities = Vec::with_capacity(infos.len());
        for info in &infos {
            entities.push(self.source.fetch(info).await?);
        }
        Ok(entities)
    }
}

async fn realize<S: EntityDeltaSource>(
    source: Arc<S>,
    batch: StoreResult<Vec<EntityDelta>>,
) -> StoreResult<Vec<ChangeNotification>> {
    let batch = batch?;
    let mut notifications = Vec::with_capacity(batch.len());
    for delta in batch {
        let notification = match delta.change_type {
            ChangeType::Add => ChangeNotification::Add(source.fetch(&delta.info).await?),
            ChangeType::Update => ChangeNotification::Update(source.fetch(&delta.info).await?),
            ChangeType::Delete => ChangeNotification::Delete(delta.info),
        };
        notifications.push(notification);
    }
    debug!(count = notifications.len(), "realized change batch");
    Ok(notifications)
}

#[async_trait]
impl<S: EntityDeltaSource> ConfigStore for DeltaConfigStore<S> {
    async fn list_entity_info(&self, types: &[EntityType]) -> StoreResult<Vec<EntityInfo>> {
        self.source.list(types).await
    }

    async fn fetch_entity(&self, info: &EntityInfo) -> StoreResult<Entity> {
        self.source.fetch(info).await
    }

    fn stream_change_batches(&self, known: Vec<EntityInfo>, types: &[EntityType]) -> ChangeBatchStream {
        let source = Arc::clone(&self.source);
        self.source
            .deltas(known, types)
            .then(move |batch| realize(Arc::clone(&source), batch))
            .boxed()
    }
}
