//! The contract every runtime flavor implements.

use crate::error::RuntimeResult;
use crate::result::PolicyResult;
use policy_loading::PolicyLoadTarget;
use policy_types::PolicyVersion;

/// A load target that can also execute the policies it holds.
///
/// `invoke` returns `Ok(PolicyResult::Failure(..))` for bad requests and
/// `Err(RuntimeError::PolicyNotFound)` when asked for a version it never
/// loaded.
pub trait PolicyRuntimeContext: PolicyLoadTarget {
    type Request;
    type Response;

    fn invoke(&self, version: &PolicyVersion, request: &Self::Request) -> RuntimeResult<PolicyResult<Self::Response>>;
}
