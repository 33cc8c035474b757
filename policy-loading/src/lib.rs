//! Load orchestration for versioned policy artifacts.
//!
//! This crate keeps a [`PolicyLoadTarget`] converged with a
//! [`ConfigStore`]. It provides:
//! - the store and load-target contracts plus no-op implementations
//! - [`PolicyLoadManager`], which runs the initial load and the change loop
//! - load lifecycle events and an ordered, failure-isolating fan-out
//! - backoff configuration for change-stream resubscription
//! - [`DeltaConfigStore`], adapting identity-only delta sources

pub mod delta;
pub mod error;
pub mod event;
pub mod listener;
pub mod manager;
pub mod retry;
pub mod store;
pub mod target;

pub use delta::{DeltaConfigStore, EntityDelta, EntityDeltaSource};
pub use error::{
    AggregateScope, AggregatedLoadError, EntityFailure, LoadError, ManagerError, ManagerResult, StoreError,
    StoreResult, panic_message,
};
pub use event::{EntityLoadEvent, LoadOperationResult, LoadTiming, NonLoadingError};
pub use listener::{AggregateEntityLoadListener, EntityLoadListener};
pub use manager::{LoadManagerConfig, MAX_VERSION_ATTEMPTS, PolicyLoadManager};
pub use retry::RetryConfig;
pub use store::{ChangeBatchStream, ConfigStore, EmptyConfigStore};
pub use target::{NoOpLoadTarget, PolicyLoadTarget};
