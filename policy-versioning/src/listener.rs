//! Keeps the version index in step with load events.

use crate::service::PolicyVersionService;
use anyhow::Context;
use policy_loading::{EntityLoadEvent, EntityLoadListener, LoadOperationResult};
use std::sync::Arc;

/// Registers loaded policies and forgets unloaded ones. A loaded patch
/// replaces whatever patch of the same `major.minor` the runtime held before.
#[derive(Debug, Clone)]
pub struct PolicyVersionEventListener {
    versions: Arc<PolicyVersionService>,
}

impl PolicyVersionEventListener {
    pub fn new(versions: Arc<PolicyVersionService>) -> Self {
        Self { versions }
    }
}

impl EntityLoadListener for PolicyVersionEventListener {
    fn on_event(&self, event: &EntityLoadEvent) -> anyhow::Result<()> {
        let EntityLoadEvent::Operation(op) = event else {
            return Ok(());
        };
        match op {
            LoadOperationResult::Loaded { entity, .. } => {
                if let Some(policy) = entity.as_policy() {
                    let status = policy
                        .activation_status()
                        .with_context(|| format!("reading status of {}", policy.info()))?;
                    self.versions.replace(policy.info(), status);
                }
            }
            LoadOperationResult::Unloaded { info, .. } => self.versions.remove(info),
            LoadOperationResult::Failure { .. } => {}
        }
        Ok(())
    }
}
