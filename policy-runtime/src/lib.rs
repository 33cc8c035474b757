//! Runtime contexts for loaded policies.
//!
//! A runtime context is the load target the load manager drives and the
//! component that executes policies on request. Two flavors ship here:
//! - [`ConfigPolicyRuntimeContext`] resolves configuration values only
//! - [`DecisionPolicyRuntimeContext`] evaluates decision tables in a
//!   [`DecisionEngine`], with configuration merged into the arguments
//!
//! [`PolicyInvoker`] ties a context to the version index.

mod config_context;
mod context;
pub mod decision;
mod error;
mod invoker;
mod registry;
mod result;

pub use config_context::{ConfigPolicyRequest, ConfigPolicyResponse, ConfigPolicyRuntimeContext};
pub use context::PolicyRuntimeContext;
pub use decision::{
    DecisionEngine, DecisionPolicyRequest, DecisionPolicyResponse, DecisionPolicyRuntimeContext, RuleRuntimeLoader,
};
pub use error::{PolicyError, PolicyErrorInfo, RuntimeError, RuntimeResult};
pub use invoker::{InvocationOutcome, PolicyInvoker, PolicyRequestInfo, PolicyResultHandler};
pub use registry::{Displaced, PatchRegistry};
pub use result::PolicyResult;
