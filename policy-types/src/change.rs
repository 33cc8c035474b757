//! Change notifications describing drift between a store and the runtime.

use crate::entity::{Entity, EntityInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change a notification (or load operation) represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Update,
    Delete,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One delta inside a change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ChangeNotification {
    Add(Entity),
    Update(Entity),
    Delete(EntityInfo),
}

impl ChangeNotification {
    pub const fn change_type(&self) -> ChangeType {
        match self {
            Self::Add(_) => ChangeType::Add,
            Self::Update(_) => ChangeType::Update,
            Self::Delete(_) => ChangeType::Delete,
        }
    }

    pub fn info(&self) -> &EntityInfo {
        match self {
            Self::Add(e) | Self::Update(e) => e.info(),
            Self::Delete(info) => info,
        }
    }
}
