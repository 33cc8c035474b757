//! Seam to the rule engine that executes decision tables.

use super::model::RuleDefinitionModel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Input and output of one evaluation.
pub type Arguments = Map<String, Value>;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no rule runtime named '{0}'")]
    UnknownRuntime(String),

    #[error("no rule unit '{rule_unit}' in runtime '{runtime_id}'")]
    UnknownRuleUnit { runtime_id: String, rule_unit: String },

    #[error("rule engine failure: {0}")]
    Internal(String),
}

/// Descriptive attributes attached to a loaded rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetMetadata {
    /// Patch identifier the rule set was built from.
    pub identifier: String,
    pub policy_name: String,
    pub policy_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetLoadStatus {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvaluationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: EvaluationStatus,
    pub result: Arguments,
}

impl Evaluation {
    pub fn success(result: Arguments) -> Self {
        Self {
            status: EvaluationStatus::Success,
            result,
        }
    }

    pub fn failure() -> Self {
        Self {
            status: EvaluationStatus::Failure,
            result: Arguments::new(),
        }
    }
}

/// A rule engine holding named runtimes, each compiled from a rule set.
///
/// Loading a runtime id that already exists replaces it.
pub trait DecisionEngine: Send + Sync {
    fn load_rule_set(
        &self,
        runtime_id: &str,
        rules: &[RuleDefinitionModel],
        metadata: &RuleSetMetadata,
    ) -> EngineResult<RuleSetLoadStatus>;

    fn remove_rule_set(&self, runtime_id: &str) -> EngineResult<()>;

    fn evaluate(&self, runtime_id: &str, rule_unit: &str, input: &Arguments) -> EngineResult<Evaluation>;
}

/// In-memory engine for tests and local runs.
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::{Mutex, MutexGuard};

    type Evaluator = Box<dyn Fn(&str, &Arguments) -> EngineResult<Evaluation> + Send + Sync>;

    #[derive(Default)]
    struct State {
        rule_sets: BTreeMap<String, (Vec<String>, RuleSetMetadata)>,
        refuse_load: HashSet<String>,
        error_on_load: HashSet<String>,
        fail_remove: bool,
        loads: Vec<String>,
        removals: Vec<String>,
        evaluations: Vec<(String, String, Arguments)>,
    }

    /// Echoes its input by default: the result is the evaluation input plus
    /// a `ruleUnit` entry.
    pub struct MockDecisionEngine {
        state: Mutex<State>,
        evaluator: Mutex<Option<Evaluator>>,
    }

    impl Default for MockDecisionEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for MockDecisionEngine {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockDecisionEngine")
                .field("runtimes", &self.runtimes())
                .finish_non_exhaustive()
        }
    }

    impl MockDecisionEngine {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State::default()),
                evaluator: Mutex::new(None),
            }
        }

        fn state(&self) -> MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Replaces the default echo evaluator.
        pub fn set_evaluator(
            &self,
            evaluator: impl Fn(&str, &Arguments) -> EngineResult<Evaluation> + Send + Sync + 'static,
        ) {
            *self.evaluator.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(evaluator));
        }

        /// Answers loads of `runtime_id` with a failure status.
        pub fn refuse_load(&self, runtime_id: &str) {
            self.state().refuse_load.insert(runtime_id.to_string());
        }

        /// Answers loads of `runtime_id` with an error.
        pub fn error_on_load(&self, runtime_id: &str) {
            self.state().error_on_load.insert(runtime_id.to_string());
        }

        pub fn fail_remove(&self, fail: bool) {
            self.state().fail_remove = fail;
        }

        pub fn runtimes(&self) -> Vec<String> {
            self.state().rule_sets.keys().cloned().collect()
        }

        /// Rule names of a loaded runtime.
        pub fn rules(&self, runtime_id: &str) -> Option<Vec<String>> {
            self.state().rule_sets.get(runtime_id).map(|(names, _)| names.clone())
        }

        pub fn metadata(&self, runtime_id: &str) -> Option<RuleSetMetadata> {
            self.state().rule_sets.get(runtime_id).map(|(_, m)| m.clone())
        }

        /// Every load attempt in call order, refused ones included.
        pub fn loads(&self) -> Vec<String> {
            self.state().loads.clone()
        }

        /// Every removal attempt in call order, failed ones included.
        pub fn removals(&self) -> Vec<String> {
            self.state().removals.clone()
        }

        /// `(runtime_id, rule_unit, input)` of every evaluation.
        pub fn evaluations(&self) -> Vec<(String, String, Arguments)> {
            self.state().evaluations.clone()
        }
    }

    impl DecisionEngine for MockDecisionEngine {
        fn load_rule_set(
            &self,
            runtime_id: &str,
            rules: &[RuleDefinitionModel],
            metadata: &RuleSetMetadata,
        ) -> EngineResult<RuleSetLoadStatus> {
            let mut state = self.state();
            state.loads.push(runtime_id.to_string());
            if state.error_on_load.contains(runtime_id) {
                return Err(EngineError::Internal(format!("cannot compile {runtime_id}")));
            }
            if state.refuse_load.contains(runtime_id) {
                return Ok(RuleSetLoadStatus::Failure("invalid decision table".into()));
            }
            let names = rules.iter().map(|r| r.name().to_string()).collect();
            state
                .rule_sets
                .insert(runtime_id.to_string(), (names, metadata.clone()));
            Ok(RuleSetLoadStatus::Success)
        }

        fn remove_rule_set(&self, runtime_id: &str) -> EngineResult<()> {
            let mut state = self.state();
            state.removals.push(runtime_id.to_string());
            if state.fail_remove {
                return Err(EngineError::Internal(format!("cannot dispose {runtime_id}")));
            }
            state
                .rule_sets
                .remove(runtime_id)
                .map(|_| ())
                .ok_or_else(|| EngineError::UnknownRuntime(runtime_id.to_string()))
        }

        fn evaluate(&self, runtime_id: &str, rule_unit: &str, input: &Arguments) -> EngineResult<Evaluation> {
            {
                let mut state = self.state();
                state
                    .evaluations
                    .push((runtime_id.to_string(), rule_unit.to_string(), input.clone()));
                let (names, _) = state
                    .rule_sets
                    .get(runtime_id)
                    .ok_or_else(|| EngineError::UnknownRuntime(runtime_id.to_string()))?;
                if !names.iter().any(|n| n == rule_unit) {
                    return Err(EngineError::UnknownRuleUnit {
                        runtime_id: runtime_id.to_string(),
                        rule_unit: rule_unit.to_string(),
                    });
                }
            }

            if let Some(evaluator) = self.evaluator.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
                return evaluator(rule_unit, input);
            }
            let mut result = input.clone();
            result.insert("ruleUnit".into(), Value::String(rule_unit.to_string()));
            Ok(Evaluation::success(result))
        }
    }
}
