//! Error types for policy invocation.

use policy_types::PatchIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Typed request failures. Each carries a stable numeric code that hosts
/// surface to their callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyError {
    /// The request used a key under the reserved `config.` prefix.
    ReservedPrefixUsed,
    /// The requested rule unit is not part of the policy.
    MissingRuleUnit,
    /// The rule engine failed or reported a non-success status.
    ExecutionError,
    /// No configuration matches the business event.
    MissingConfig,
}

impl PolicyError {
    pub fn code(self) -> u32 {
        match self {
            Self::ReservedPrefixUsed => 787_400,
            Self::MissingRuleUnit => 787_401,
            Self::ExecutionError => 787_200,
            Self::MissingConfig => 788_401,
        }
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReservedPrefixUsed => "RESERVED_PREFIX_USED",
            Self::MissingRuleUnit => "MISSING_RULE_UNIT",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::MissingConfig => "MISSING_CONFIG",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// A policy error plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyErrorInfo {
    pub error: PolicyError,
    pub message: String,
}

impl PolicyErrorInfo {
    pub fn new(error: PolicyError, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }

    pub fn code(&self) -> u32 {
        self.error.code()
    }
}

impl fmt::Display for PolicyErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Integration errors. These indicate a caller bug rather than a bad
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The version index resolved a version this runtime never loaded.
    #[error("Requested Policy Not Found. identifier:={identifier}")]
    PolicyNotFound { identifier: PatchIdentifier },
}
