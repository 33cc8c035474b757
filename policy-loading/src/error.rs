//! Error types for the loading layer.

use policy_types::{EntityInfo, PatchIdentifier};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for load-manager lifecycle operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Store or transport failure. Propagates to the subscription layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Network or availability problem.
    #[error("store connectivity error: {0}")]
    Connectivity(String),

    /// Credentials rejected. Retrying will not help.
    #[error("store permission denied: {0}")]
    Permission(String),

    /// Requested entity does not exist (e.g. deleted between list and fetch).
    #[error("entity not found in store: {0}")]
    NotFound(String),

    /// Malformed response from the store.
    #[error("store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Transient errors are worth resubscribing after.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permission(_))
    }
}

/// Failure of one load or unload attempt. Always caught at the
/// per-entity boundary.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported Entity type [entityInfo={0}]")]
    UnsupportedEntityKind(EntityInfo),

    /// Content could not be parsed.
    #[error("invalid content in {patch_id}: {source}")]
    Content {
        patch_id: PatchIdentifier,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The rule engine refused the rule set.
    #[error("RuntimeName: {runtime_id}, Rules: {}", .rules.join(","))]
    RuleSetLoad { runtime_id: String, rules: Vec<String> },

    /// Two different patch identifiers map to the same engine runtime id.
    #[error("runtime id '{runtime_id}' already used by '{existing}', cannot load '{requested}'")]
    RuntimeIdConflict {
        runtime_id: String,
        existing: String,
        requested: String,
    },

    /// Rule-engine failure outside of rule-set loading.
    #[error("rule engine error: {0}")]
    RuleEngine(String),

    /// Fetching a prior version failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The load target panicked.
    #[error("load target panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    /// Wraps any parse error for `patch_id`.
    pub fn content(patch_id: PatchIdentifier, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Content {
            patch_id,
            source: Box::new(source),
        }
    }
}

/// One failed entity inside an aggregate.
#[derive(Debug, Clone)]
pub struct EntityFailure {
    pub info: EntityInfo,
    pub error: Arc<LoadError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateScope {
    Startup,
    Batch,
}

/// Every failure of a startup load or of one change batch.
#[derive(Debug, Clone)]
pub struct AggregatedLoadError {
    scope: AggregateScope,
    failures: Vec<EntityFailure>,
}

impl AggregatedLoadError {
    pub fn startup(failures: Vec<EntityFailure>) -> Self {
        Self {
            scope: AggregateScope::Startup,
            failures,
        }
    }

    pub fn batch(failures: Vec<EntityFailure>) -> Self {
        Self {
            scope: AggregateScope::Batch,
            failures,
        }
    }

    pub const fn scope(&self) -> AggregateScope {
        self.scope
    }

    pub fn failures(&self) -> &[EntityFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregatedLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            AggregateScope::Startup => {
                let locations: Vec<&str> = self
                    .failures
                    .iter()
                    .map(|fail| fail.info.location_prefix())
                    .collect();
                write!(f, "Entity Locations: {}", locations.join(", "))
            }
            AggregateScope::Batch => {
                let messages: Vec<String> = self
                    .failures
                    .iter()
                    .map(|fail| format!("{}: {}", fail.info, fail.error))
                    .collect();
                write!(f, "Error in Batch Load with following messages: [{}]", messages.join(", "))
            }
        }
    }
}

impl std::error::Error for AggregatedLoadError {}

/// Lifecycle errors of the load manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("load manager is already initialized")]
    AlreadyInitialized,

    #[error("initial entity listing failed: {0}")]
    Store(#[from] StoreError),

    #[error("strict startup failed: {0}")]
    Startup(#[from] AggregatedLoadError),
}

/// Renders a caught panic payload for logs and error values.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_permission_errors_are_terminal() {
        assert!(!StoreError::Permission("denied".into()).is_retryable());
        assert!(StoreError::Connectivity("reset".into()).is_retryable());
        assert!(StoreError::NotFound("a/1.0".into()).is_retryable());
        assert!(StoreError::Protocol("garbled".into()).is_retryable());
    }
}
