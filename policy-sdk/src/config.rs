//! Host configuration for a policy core.
//!
//! Read from a TOML file:
//!
//! ```toml
//! strict_startup = true
//! matching_strategy = "match_exact_only"
//! config_environment = "qa"
//!
//! [stream_retry]
//! initial_delay_ms = 500
//! max_retries = 20
//! ```
//!
//! Every key is optional.

use crate::error::SdkResult;
use policy_config::MatchingStrategies;
use policy_loading::{LoadManagerConfig, RetryConfig};
use policy_runtime::{ConfigPolicyRuntimeContext, DecisionEngine, DecisionPolicyRuntimeContext};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyCoreConfig {
    /// Fail initialization when any policy fails to load.
    pub strict_startup: bool,
    pub matching_strategy: MatchingStrategies,
    /// Selects the `features-<env>.json` override.
    pub config_environment: Option<String>,
    pub stream_retry: RetryConfig,
}

impl PolicyCoreConfig {
    /// Strict parse. Unknown keys are errors.
    pub fn from_toml_str(contents: &str) -> SdkResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads `path`, falling back to defaults when the file is missing,
    /// unreadable or malformed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No policy core config found, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded policy core config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse policy core config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read policy core config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_manager_config(&self) -> LoadManagerConfig {
        LoadManagerConfig {
            strict_startup: self.strict_startup,
            retry: self.stream_retry.clone(),
            ..LoadManagerConfig::default()
        }
    }

    /// A configuration-only runtime using this config's strategy and
    /// environment.
    pub fn config_runtime_context(&self) -> ConfigPolicyRuntimeContext {
        ConfigPolicyRuntimeContext::new(self.matching_strategy).with_environment(self.config_environment.clone())
    }

    /// A decision runtime over `engine` using this config's strategy and
    /// environment.
    pub fn decision_runtime_context(&self, engine: Arc<dyn DecisionEngine>) -> DecisionPolicyRuntimeContext {
        DecisionPolicyRuntimeContext::new(engine, Arc::new(self.matching_strategy))
            .with_environment(self.config_environment.clone())
    }
}
