//! Outcome of one policy invocation.

use crate::error::{PolicyError, PolicyErrorInfo};
use serde::{Deserialize, Serialize};

/// Either the policy's response or a typed request failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum PolicyResult<R> {
    Success(R),
    Failure(PolicyErrorInfo),
}

impl<R> PolicyResult<R> {
    pub fn failure(error: PolicyError, message: impl Into<String>) -> Self {
        Self::Failure(PolicyErrorInfo::new(error, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&R> {
        match self {
            Self::Success(r) => Some(r),
            Self::Failure(_) => None,
        }
    }

    pub fn error_info(&self) -> Option<&PolicyErrorInfo> {
        match self {
            Self::Success(_) => None,
            Self::Failure(info) => Some(info),
        }
    }

    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> PolicyResult<T> {
        match self {
            Self::Success(r) => PolicyResult::Success(f(r)),
            Self::Failure(info) => PolicyResult::Failure(info),
        }
    }

    pub fn into_result(self) -> Result<R, PolicyErrorInfo> {
        match self {
            Self::Success(r) => Ok(r),
            Self::Failure(info) => Err(info),
        }
    }
}
