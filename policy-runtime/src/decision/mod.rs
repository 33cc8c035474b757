//! Decision-table runtime: rule groups built from `rules/` items, loaded
//! into a [`DecisionEngine`] and evaluated with configuration merged into
//! the arguments.

mod context;
pub mod engine;
mod loader;
mod model;

pub use context::{DecisionPolicyRequest, DecisionPolicyResponse, DecisionPolicyRuntimeContext, RESERVED_CONFIG_PREFIX};
pub use engine::{
    Arguments, DecisionEngine, EngineError, EngineResult, Evaluation, EvaluationStatus, RuleSetLoadStatus,
    RuleSetMetadata,
};
pub use loader::RuleRuntimeLoader;
pub use model::{RuleDefinitionModel, RuleDefinitionModelGroup, sanitize_runtime_id};
