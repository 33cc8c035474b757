//! Runtime flavor that evaluates decision tables in a rule engine.

use super::engine::{Arguments, DecisionEngine, EvaluationStatus};
use super::loader::RuleRuntimeLoader;
use super::model::RuleDefinitionModelGroup;
use crate::context::PolicyRuntimeContext;
use crate::error::{PolicyError, RuntimeError, RuntimeResult};
use crate::registry::PatchRegistry;
use crate::result::PolicyResult;
use policy_config::{ConfigManagementModel, ConfigMatchingStrategy};
use policy_loading::{LoadError, PolicyLoadTarget};
use policy_types::{Entity, EntityInfo, PolicyVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Argument keys under this prefix are filled from policy configuration.
pub const RESERVED_CONFIG_PREFIX: &str = "config.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicyRequest {
    pub business_event: String,
    /// File name of the decision table to evaluate, e.g. `decision.dmn`.
    pub rule_unit: String,
    #[serde(default)]
    pub body: Arguments,
}

impl DecisionPolicyRequest {
    pub fn new(business_event: impl Into<String>, rule_unit: impl Into<String>) -> Self {
        Self {
            business_event: business_event.into(),
            rule_unit: rule_unit.into(),
            body: Arguments::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicyResponse {
    pub result: Arguments,
}

#[derive(Debug)]
struct DecisionPolicy {
    rules: RuleDefinitionModelGroup,
    config: Option<ConfigManagementModel>,
}

/// Holds loaded decision policies and evaluates them through a
/// [`DecisionEngine`].
#[derive(Debug)]
pub struct DecisionPolicyRuntimeContext {
    loader: RuleRuntimeLoader,
    strategy: Arc<dyn ConfigMatchingStrategy>,
    environment: Option<String>,
    registry: PatchRegistry<DecisionPolicy>,
}

impl DecisionPolicyRuntimeContext {
    pub fn new(engine: Arc<dyn DecisionEngine>, strategy: Arc<dyn ConfigMatchingStrategy>) -> Self {
        Self {
            loader: RuleRuntimeLoader::new(engine),
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

    fn release(&self, info: &EntityInfo, policy: &DecisionPolicy) {
        match self.loader.remove(&policy.rules) {
            Ok(()) => debug!(patch_id = %info.patch_identifier(), "Released displaced rule set"),
            Err(e) => error!(
                patch_id = %info.patch_identifier(),
                error = %e,
                "Failed to release displaced rule set"
            ),
        }
    }
}

impl PolicyLoadTarget for DecisionPolicyRuntimeContext {
    fn load(&self, entity: &Entity) -> Result<(), LoadError> {
        let policy = entity
            .as_policy()
            .ok_or_else(|| LoadError::UnsupportedEntityKind(entity.info().without_priors()))?;
        let info = policy.info();
        let patch_id = info.patch_identifier();
        let digest = policy.content_digest();
        if self.registry.is_current(info, &digest) {
            debug!(%patch_id, "Decision policy unchanged, skipping");
            return Ok(());
        }

        let config = ConfigManagementModel::from_policy(policy, self.environment.as_deref())
            .map_err(|e| LoadError::content(patch_id.clone(), e))?;
        let rules = RuleDefinitionModelGroup::from_policy(policy).map_err(|e| LoadError::content(patch_id.clone(), e))?;
        self.loader.load(&rules)?;

        let displaced = self.registry.install(info, digest, DecisionPolicy { rules, config });
        if let Some(displaced) = displaced {
            self.release(&displaced.info, &displaced.content);
        }
        info!(%patch_id, "Decision policy loaded");
        Ok(())
    }

    fn unload(&self, info: &EntityInfo) -> Result<(), LoadError> {
        let patch_id = info.patch_identifier();
        let Some(policy) = self.registry.remove_if_latest(info) else {
            debug!(%patch_id, "Not the latest patch, nothing to unload");
            return Ok(());
        };
        self.loader.remove(&policy.rules)?;
        info!(%patch_id, "Decision policy unloaded");
        Ok(())
    }

    fn loaded_entities(&self) -> Vec<EntityInfo> {
        self.registry.loaded_entities()
    }
}

impl PolicyRuntimeContext for DecisionPolicyRuntimeContext {
    type Request = DecisionPolicyRequest;
    type Response = DecisionPolicyResponse;

    fn invoke(&self, version: &PolicyVersion, request: &Self::Request) -> RuntimeResult<PolicyResult<Self::Response>> {
        let mut reserved: Vec<&str> = request
            .body
            .keys()
            .map(String::as_str)
            .filter(|k| k.starts_with(RESERVED_CONFIG_PREFIX))
            .collect();
        if !reserved.is_empty() {
            reserved.sort_unstable();
            return Ok(PolicyResult::failure(
                PolicyError::ReservedPrefixUsed,
                format!(
                    "Request arguments must not use the reserved prefix '{RESERVED_CONFIG_PREFIX}': {}",
                    reserved.join(",")
                ),
            ));
        }

        let identifier = version.patch_identifier();
        let policy = self
            .registry
            .get(&identifier)
            .ok_or(RuntimeError::PolicyNotFound { identifier })?;

        let configuration = match &policy.config {
            None => Default::default(),
            Some(model) => match model.configuration(&request.business_event, self.strategy.as_ref()) {
                Some(configuration) => configuration,
                None => {
                    return Ok(PolicyResult::failure(
                        PolicyError::MissingConfig,
                        format!(
                            "Could not find a configuration that matches supplied business event '{}'",
                            request.business_event
                        ),
                    ));
                }
            },
        };

        let mut arguments = request.body.clone();
        for (key, value) in configuration {
            arguments.insert(format!("{RESERVED_CONFIG_PREFIX}{key}"), value);
        }

        if !policy.rules.contains_rule_unit(&request.rule_unit) {
            return Ok(PolicyResult::failure(
                PolicyError::MissingRuleUnit,
                format!("Could not find rule unit '{}' in requested policy.", request.rule_unit),
            ));
        }

        let runtime_id = policy.rules.runtime_id();
        Ok(match self.loader.evaluate(runtime_id, &request.rule_unit, &arguments) {
            Ok(evaluation) if evaluation.status == EvaluationStatus::Success => {
                PolicyResult::Success(DecisionPolicyResponse {
                    result: evaluation.result,
                })
            }
            Ok(_) => PolicyResult::failure(PolicyError::ExecutionError, "Decision execution error."),
            Err(e) => {
                error!(runtime_id, rule_unit = %request.rule_unit, error = %e, "Decision invocation failed");
                PolicyResult::failure(PolicyError::ExecutionError, "Decision invocation error.")
            }
        })
    }
}
