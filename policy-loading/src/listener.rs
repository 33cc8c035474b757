//! Listener fan-out.
//!
//! Listeners are host code, so a failing or panicking listener is logged
//! and skipped; the remaining listeners still see the event.

use crate::error::panic_message;
use crate::event::EntityLoadEvent;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

/// Receives load lifecycle events.
pub trait EntityLoadListener: Send + Sync {
    fn on_event(&self, event: &EntityLoadEvent) -> anyhow::Result<()>;
}

/// Delivers `event` to `listener`, absorbing errors and panics.
pub(crate) fn notify(listener: &dyn EntityLoadListener, event: &EntityLoadEvent) {
    match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "load event listener failed"),
        Err(payload) => error!(panic = %panic_message(payload), "load event listener panicked"),
    }
}

/// Ordered fan-out to any number of listeners.
#[derive(Clone, Default)]
pub struct AggregateEntityLoadListener {
    listeners: Vec<Arc<dyn EntityLoadListener>>,
}

impl AggregateEntityLoadListener {
    pub fn new(listeners: Vec<Arc<dyn EntityLoadListener>>) -> Self {
        Self { listeners }
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EntityLoadListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn push(&mut self, listener: Arc<dyn EntityLoadListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for AggregateEntityLoadListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateEntityLoadListener")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EntityLoadListener for AggregateEntityLoadListener {
    fn on_event(&self, event: &EntityLoadEvent) -> anyhow::Result<()> {
        for listener in &self.listeners {
            notify(listener.as_ref(), event);
        }
        Ok(())
    }
}

/// Test doubles.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingListener {
        events: Mutex<Vec<EntityLoadEvent>>,
    }

    impl RecordingListener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<EntityLoadEvent> {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        pub fn len(&self) -> usize {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl EntityLoadListener for RecordingListener {
        fn on_event(&self, event: &EntityLoadEvent) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.clone());
            Ok(())
        }
    }
}
