//! Load lifecycle events.
//!
//! Every load or unload attempt yields one [`LoadOperationResult`], which is
//! both published to listeners and returned to the caller for consolidation.
//! Store-level trouble on the change stream is reported separately as a
//! [`NonLoadingError`].

use crate::error::{EntityFailure, LoadError, StoreError};
use chrono::{DateTime, Utc};
use policy_types::{ChangeType, Entity, EntityInfo};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// When an operation started and how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTiming {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Captures the start of an operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stopwatch {
    started_at: DateTime<Utc>,
    instant: Instant,
}

impl Stopwatch {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn finish(self) -> LoadTiming {
        LoadTiming {
            started_at: self.started_at,
            elapsed: self.instant.elapsed(),
        }
    }
}

/// Immutable record of one attempted operation.
#[derive(Debug, Clone)]
pub enum LoadOperationResult {
    Loaded {
        entity: Arc<Entity>,
        change_type: ChangeType,
        is_startup: bool,
        timing: LoadTiming,
    },
    Unloaded {
        info: EntityInfo,
        change_type: ChangeType,
        is_startup: bool,
        timing: LoadTiming,
    },
    Failure {
        change_type: ChangeType,
        error: Arc<LoadError>,
        is_startup: bool,
        info: EntityInfo,
        timing: LoadTiming,
    },
}

impl LoadOperationResult {
    pub fn info(&self) -> &EntityInfo {
        match self {
            Self::Loaded { entity, .. } => entity.info(),
            Self::Unloaded { info, .. } | Self::Failure { info, .. } => info,
        }
    }

    pub const fn change_type(&self) -> ChangeType {
        match self {
            Self::Loaded { change_type, .. }
            | Self::Unloaded { change_type, .. }
            | Self::Failure { change_type, .. } => *change_type,
        }
    }

    pub const fn is_startup(&self) -> bool {
        match self {
            Self::Loaded { is_startup, .. }
            | Self::Unloaded { is_startup, .. }
            | Self::Failure { is_startup, .. } => *is_startup,
        }
    }

    pub const fn timing(&self) -> LoadTiming {
        match self {
            Self::Loaded { timing, .. } | Self::Unloaded { timing, .. } | Self::Failure { timing, .. } => {
                *timing
            }
        }
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The failure detail, if this was a failure.
    pub fn failure(&self) -> Option<EntityFailure> {
        match self {
            Self::Failure { info, error, .. } => Some(EntityFailure {
                info: info.clone(),
                error: Arc::clone(error),
            }),
            _ => None,
        }
    }
}

/// Store-level error on the change stream. `error == None` marks that
/// monitoring has stopped for good.
#[derive(Debug, Clone)]
pub struct NonLoadingError {
    pub error: Option<Arc<StoreError>>,
    pub at: DateTime<Utc>,
}

impl NonLoadingError {
    pub fn new(error: Option<StoreError>) -> Self {
        Self {
            error: error.map(Arc::new),
            at: Utc::now(),
        }
    }

    /// True when this marks the end of the monitoring loop.
    pub const fn is_terminal(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a listener may receive.
#[derive(Debug, Clone)]
pub enum EntityLoadEvent {
    Operation(LoadOperationResult),
    NonLoading(NonLoadingError),
}

impl From<LoadOperationResult> for EntityLoadEvent {
    fn from(result: LoadOperationResult) -> Self {
        Self::Operation(result)
    }
}

impl From<NonLoadingError> for EntityLoadEvent {
    fn from(err: NonLoadingError) -> Self {
        Self::NonLoading(err)
    }
}
