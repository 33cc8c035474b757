//! The narrow interface the load manager drives.

use crate::error::LoadError;
use policy_types::{Entity, EntityInfo};

/// Something that can hold loaded policy entities.
///
/// Calls arrive from a single load path at a time. Implementations must
/// apply each `load` as one visible state transition.
pub trait PolicyLoadTarget: Send + Sync {
    fn load(&self, entity: &Entity) -> Result<(), LoadError>;

    fn unload(&self, info: &EntityInfo) -> Result<(), LoadError>;

    /// Currently loaded entities, sorted by location prefix.
    fn loaded_entities(&self) -> Vec<EntityInfo>;
}

/// Accepts everything and holds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLoadTarget;

impl PolicyLoadTarget for NoOpLoadTarget {
    fn load(&self, _entity: &Entity) -> Result<(), LoadError> {
        Ok(())
    }

    fn unload(&self, _info: &EntityInfo) -> Result<(), LoadError> {
        Ok(())
    }

    fn loaded_entities(&self) -> Vec<EntityInfo> {
        Vec::new()
    }
}
