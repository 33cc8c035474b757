//! Error types for configuration parsing.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a configuration model.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A document is not valid JSON or has the wrong shape.
    #[error("invalid configuration document {name}: {source}")]
    Document {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration documents exist but `defaults.json` does not.
    #[error("configuration is missing defaults.json")]
    MissingDefaults,

    /// `schema.json` requires a default that `defaults.json` lacks.
    #[error("defaults.json is missing required key '{0}'")]
    MissingRequiredDefault(String),

    /// Two use-case documents declare the same key.
    #[error("duplicate use case '{0}'")]
    DuplicateUseCase(String),

    /// Unrecognized matching strategy name.
    #[error("unknown matching strategy: {0}")]
    UnknownStrategy(String),
}
