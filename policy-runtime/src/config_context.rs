//! Runtime flavor that serves configuration values only.

use crate::context::PolicyRuntimeContext;
use crate::error::{PolicyError, RuntimeError, RuntimeResult};
use crate::registry::PatchRegistry;
use crate::result::PolicyResult;
use policy_config::{ConfigManagementModel, ConfigMap, ConfigMatchingStrategy};
use policy_loading::{LoadError, PolicyLoadTarget};
use policy_types::{Entity, EntityInfo, PolicyVersion};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPolicyRequest {
    pub business_event: String,
}

impl ConfigPolicyRequest {
    pub fn new(business_event: impl Into<String>) -> Self {
        Self {
            business_event: business_event.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPolicyResponse {
    pub configuration: ConfigMap,
}

/// Holds each loaded policy's configuration model and resolves values for
/// a business event.
///
/// Policies without configuration documents still count as loaded; asking
/// them for configuration yields `MissingConfig`.
#[derive(Debug)]
pub struct ConfigPolicyRuntimeContext {
    strategy: Arc<dyn ConfigMatchingStrategy>,
    environment: Option<String>,
    registry: PatchRegistry<Option<ConfigManagementModel>>,
}

impl ConfigPolicyRuntimeContext {
    pub fn new(strategy: impl ConfigMatchingStrategy + 'static) -> Self {
        Self::with_shared_strategy(Arc::new(strategy))
    }

    pub fn with_shared_strategy(strategy: Arc<dyn ConfigMatchingStrategy>) -> Self {
        Self {
            strategy,
            environment: None,
            registry: PatchRegistry::new(),
        }
    }

    /// Selects which `features-<env>.json` override applies.
    #[must_use]
    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }
}

impl PolicyLoadTarget for ConfigPolicyRuntimeContext {
    fn load(&self, entity: &Entity) -> Result<(), LoadError> {
        let policy = entity
            .as_policy()
            .ok_or_else(|| LoadError::UnsupportedEntityKind(entity.info().without_priors()))?;
        let info = policy.info();
        let digest = policy.content_digest();
        if self.registry.is_current(info, &digest) {
            debug!(patch_id = %info.patch_identifier(), "Configuration unchanged, skipping");
            return Ok(());
        }

        let model = ConfigManagementModel::from_policy(policy, self.environment.as_deref())
            .map_err(|e| LoadError::content(info.patch_identifier(), e))?;
        if let Some(displaced) = self.registry.install(info, digest, model) {
            debug!(
                patch_id = %info.patch_identifier(),
                previous = %displaced.info.patch_identifier(),
                "Released displaced configuration"
            );
        }
        info!(patch_id = %info.patch_identifier(), "Configuration loaded");
        Ok(())
    }

    fn unload(&self, info: &EntityInfo) -> Result<(), LoadError> {
        if self.registry.remove_if_latest(info).is_some() {
            info!(patch_id = %info.patch_identifier(), "Configuration unloaded");
        } else {
            debug!(patch_id = %info.patch_identifier(), "Not the latest patch, nothing to unload");
        }
        Ok(())
    }

    fn loaded_entities(&self) -> Vec<EntityInfo> {
        self.registry.loaded_entities()
    }
}

impl PolicyRuntimeContext for ConfigPolicyRuntimeContext {
    type Request = ConfigPolicyRequest;
    type Response = ConfigPolicyResponse;

    fn invoke(&self, version: &PolicyVersion, request: &Self::Request) -> RuntimeResult<PolicyResult<Self::Response>> {
        let identifier = version.patch_identifier();
        let model = self
            .registry
            .get(&identifier)
            .ok_or(RuntimeError::PolicyNotFound { identifier })?;

        let configuration = (*model)
            .as_ref()
            .and_then(|m| m.configuration(&request.business_event, self.strategy.as_ref()))
            .filter(|c| !c.is_empty());

        Ok(match configuration {
            Some(configuration) => PolicyResult::Success(ConfigPolicyResponse { configuration }),
            None => PolicyResult::failure(
                PolicyError::MissingConfig,
                format!(
                    "Could not find config with the use case name '{}' in requested policy.",
                    request.business_event
                ),
            ),
        })
    }
}
