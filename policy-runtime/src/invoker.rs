//! Common entry point for policy invocations.

use crate::context::PolicyRuntimeContext;
use crate::error::{PolicyErrorInfo, RuntimeResult};
use crate::result::PolicyResult;
use policy_types::PolicyVersion;
use policy_versioning::PolicyVersionService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What the caller asked for and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequestInfo {
    pub address: String,
    pub requested_version: String,
    pub resolved: PolicyVersion,
}

/// The three outcome categories a host distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome<R> {
    Success { request: PolicyRequestInfo, response: R },
    Failure { request: PolicyRequestInfo, error: PolicyErrorInfo },
    /// No loaded version satisfies the request.
    MissingPolicy { address: String, requested_version: String },
}

/// Host-supplied mapping from outcomes to the host's response type.
pub trait PolicyResultHandler<T> {
    type Output;

    fn on_missing_policy(&self, address: &str, requested_version: &str) -> Self::Output;

    fn on_success(&self, request: PolicyRequestInfo, response: T) -> Self::Output;

    fn on_failure(&self, request: PolicyRequestInfo, error: PolicyErrorInfo) -> Self::Output;
}

/// Resolves a requested version through the version index and invokes the
/// runtime context with the result.
pub struct PolicyInvoker<C: PolicyRuntimeContext> {
    context: Arc<C>,
    versions: Arc<PolicyVersionService>,
}

impl<C: PolicyRuntimeContext> Clone for PolicyInvoker<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            versions: Arc::clone(&self.versions),
        }
    }
}

impl<C: PolicyRuntimeContext> PolicyInvoker<C> {
    pub fn new(context: Arc<C>, versions: Arc<PolicyVersionService>) -> Self {
        Self { context, versions }
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn versions(&self) -> &Arc<PolicyVersionService> {
        &self.versions
    }

    /// `Err` only when the index resolved a version the context does not
    /// hold, which means the two have drifted apart.
    pub fn invoke(
        &self,
        address: &str,
        version: &str,
        request: &C::Request,
    ) -> RuntimeResult<InvocationOutcome<C::Response>> {
        let Some(resolved) = self.versions.resolve(address, version) else {
            debug!(address, version, "No loaded policy matches request");
            return Ok(InvocationOutcome::MissingPolicy {
                address: address.to_string(),
                requested_version: version.to_string(),
            });
        };

        let result = self.context.invoke(&resolved, request)?;
        let request = PolicyRequestInfo {
            address: address.to_string(),
            requested_version: version.to_string(),
            resolved,
        };
        Ok(match result {
            PolicyResult::Success(response) => InvocationOutcome::Success { request, response },
            PolicyResult::Failure(error) => InvocationOutcome::Failure { request, error },
        })
    }

    pub fn invoke_with<H>(&self, address: &str, version: &str, request: &C::Request, handler: &H) -> RuntimeResult<H::Output>
    where
        H: PolicyResultHandler<C::Response>,
    {
        Ok(match self.invoke(address, version, request)? {
            InvocationOutcome::Success { request, response } => handler.on_success(request, response),
            InvocationOutcome::Failure { request, error } => handler.on_failure(request, error),
            InvocationOutcome::MissingPolicy {
                address,
                requested_version,
            } => handler.on_missing_policy(&address, &requested_version),
        })
    }
}
