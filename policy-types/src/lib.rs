//! Core type definitions for the policy runtime.
//!
//! This crate defines the passive data shared by every other policy crate:
//! - Entity identities (`EntityInfo`) with their explicit prior-version chain
//! - Realized entities (`Entity`) and policy content items
//! - Version value objects and derived keys (`PolicyVersion`, `PatchIdentifier`, `LogicalId`)
//! - Change notifications emitted by a store
//!
//! Nothing here performs I/O. Content parsing helpers only interpret the
//! raw items an entity already carries.

mod change;
mod content;
mod entity;
mod version;

pub use change::{ChangeNotification, ChangeType};
pub use content::{ActivationStatus, ContentItem, PolicyMetadata, METADATA_FILE_NAME};
pub use entity::{Entity, EntityInfo, EntityType, PolicyEntity};
pub use version::{LogicalId, PatchIdentifier, PolicyVersion};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors raised while interpreting entity content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("malformed policy metadata in {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed JSON document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid content item path: {0}")]
    InvalidPath(String),
}
