//! Loads rule groups into the engine and guards runtime-id ownership.

use super::engine::{Arguments, DecisionEngine, EngineError, EngineResult, Evaluation, RuleSetLoadStatus};
use super::model::RuleDefinitionModelGroup;
use policy_loading::{LoadError, panic_message};
use policy_types::PatchIdentifier;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

/// Wraps a [`DecisionEngine`] and remembers which patch identifier owns
/// each runtime id, so two identifiers that sanitize alike cannot
/// overwrite each other's rules.
pub struct RuleRuntimeLoader {
    engine: Arc<dyn DecisionEngine>,
    owners: Mutex<HashMap<String, PatchIdentifier>>,
}

impl std::fmt::Debug for RuleRuntimeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRuntimeLoader")
            .field("runtimes", &self.owners().len())
            .finish_non_exhaustive()
    }
}

impl RuleRuntimeLoader {
    pub fn new(engine: Arc<dyn DecisionEngine>) -> Self {
        Self {
            engine,
            owners: Mutex::new(HashMap::new()),
        }
    }

    fn owners(&self) -> MutexGuard<'_, HashMap<String, PatchIdentifier>> {
        self.owners.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load(&self, group: &RuleDefinitionModelGroup) -> Result<(), LoadError> {
        let runtime_id = group.runtime_id();
        let mut owners = self.owners();
        if let Some(existing) = owners.get(runtime_id).filter(|id| *id != group.identifier()) {
            return Err(LoadError::RuntimeIdConflict {
                runtime_id: runtime_id.to_string(),
                existing: existing.to_string(),
                requested: group.identifier().to_string(),
            });
        }

        let rule_set_failure = || LoadError::RuleSetLoad {
            runtime_id: runtime_id.to_string(),
            rules: group.rule_names(),
        };
        match self.engine.load_rule_set(runtime_id, group.rules(), group.metadata()) {
            Ok(RuleSetLoadStatus::Success) => {}
            Ok(RuleSetLoadStatus::Failure(reason)) => {
                error!(runtime_id, %reason, "Rule set rejected by engine");
                return Err(rule_set_failure());
            }
            Err(e) => {
                error!(runtime_id, error = %e, "Rule set load failed");
                return Err(rule_set_failure());
            }
        }

        owners.insert(runtime_id.to_string(), group.identifier().clone());
        debug!(runtime_id, rules = group.rules().len(), "Rule set loaded");
        Ok(())
    }

    /// Disposes the engine runtime. Ownership is released even when the
    /// engine reports an error.
    pub fn remove(&self, group: &RuleDefinitionModelGroup) -> Result<(), LoadError> {
        let runtime_id = group.runtime_id();
        let mut owners = self.owners();
        if owners.get(runtime_id) == Some(group.identifier()) {
            owners.remove(runtime_id);
        }
        drop(owners);

        self.engine
            .remove_rule_set(runtime_id)
            .map_err(|e| LoadError::RuleEngine(e.to_string()))?;
        debug!(runtime_id, "Rule set removed");
        Ok(())
    }

    /// A panicking engine surfaces as [`EngineError::Internal`].
    pub fn evaluate(&self, runtime_id: &str, rule_unit: &str, input: &Arguments) -> EngineResult<Evaluation> {
        catch_unwind(AssertUnwindSafe(|| self.engine.evaluate(runtime_id, rule_unit, input)))
            .unwrap_or_else(|payload| Err(EngineError::Internal(format!("panicked: {}", panic_message(payload)))))
    }
}
