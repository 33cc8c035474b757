//! The assembled configuration of one policy version.

use crate::error::{ConfigError, ConfigResult};
use crate::strategy::{ConfigMatchingStrategy, ConfigSelection};
use policy_types::PolicyEntity;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Flat key/value configuration.
pub type ConfigMap = BTreeMap<String, Value>;

const DEFAULTS: &str = "defaults.json";
const FEATURES: &str = "features.json";
const SCHEMA: &str = "schema.json";

/// One use-case document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UseCase {
    /// Business-event pattern. Falls back to the file stem.
    #[serde(rename = "usecase", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub config: ConfigMap,
}

#[derive(Debug, Default, Deserialize)]
struct Schema {
    #[serde(default)]
    required: Vec<String>,
}

/// Defaults, features and use cases of one policy version.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigManagementModel {
    defaults: ConfigMap,
    features: ConfigMap,
    use_cases: BTreeMap<String, ConfigMap>,
}

impl ConfigManagementModel {
    /// Builds the model from a policy's `config/` documents.
    ///
    /// Returns `Ok(None)` when the policy has no configuration at all.
    pub fn from_policy(policy: &PolicyEntity, environment: Option<&str>) -> ConfigResult<Option<Self>> {
        Self::from_documents(policy.config_documents(), environment)
    }

    /// Builds the model from `(file name, content)` pairs.
    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = (&'a str, &'a str)>,
        environment: Option<&str>,
    ) -> ConfigResult<Option<Self>> {
        let env_features = environment.map(|env| format!("features-{env}.json"));

        let mut defaults = None;
        let mut features = ConfigMap::new();
        let mut overrides = ConfigMap::new();
        let mut schema = Schema::default();
        let mut use_cases = BTreeMap::new();
        let mut seen_any = false;

        for (name, content) in documents {
            if !name.ends_with(".json") {
                continue;
            }
            seen_any = true;
            match name {
                DEFAULTS => defaults = Some(parse::<ConfigMap>(name, content)?),
                FEATURES => features = parse(name, content)?,
                SCHEMA => schema = parse(name, content)?,
                _ if Some(name) == env_features.as_deref() => overrides = parse(name, content)?,
                // Overrides for other environments.
                _ if name.starts_with("features-") => {}
                _ => {
                    let use_case: UseCase = parse(name, content)?;
                    let key = use_case
                        .key
                        .unwrap_or_else(|| name.trim_end_matches(".json").to_string());
                    if use_cases.insert(key.clone(), use_case.config).is_some() {
                        return Err(ConfigError::DuplicateUseCase(key));
                    }
                }
            }
        }

        if !seen_any {
            return Ok(None);
        }
        let defaults = defaults.ok_or(ConfigError::MissingDefaults)?;
        if let Some(missing) = schema.required.iter().find(|k| !defaults.contains_key(*k)) {
            return Err(ConfigError::MissingRequiredDefault(missing.clone()));
        }
        features.extend(overrides);

        Ok(Some(Self {
            defaults,
            features,
            use_cases,
        }))
    }

    pub fn defaults(&self) -> &ConfigMap {
        &self.defaults
    }

    /// Use-case keys in lexical order.
    pub fn use_case_keys(&self) -> impl Iterator<Item = &str> {
        self.use_cases.keys().map(String::as_str)
    }

    /// Resolves the values for `business_event`: defaults, then features,
    /// then the selected use case. `None` when the strategy finds nothing.
    pub fn configuration(
        &self,
        business_event: &str,
        strategy: &dyn ConfigMatchingStrategy,
    ) -> Option<ConfigMap> {
        let keys: Vec<&str> = self.use_case_keys().collect();
        let selected = match strategy.select(business_event, &keys) {
            ConfigSelection::NoMatch => {
                debug!(business_event, "no use case matched");
                return None;
            }
            ConfigSelection::DefaultsOnly => None,
            ConfigSelection::UseCase(idx) => {
                let key = keys.get(idx)?;
                self.use_cases.get(*key)
            }
        };

        let mut merged = self.defaults.clone();
        merged.extend(self.features.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(values) = selected {
            merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(merged)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, content: &str) -> ConfigResult<T> {
    serde_json::from_str(content).map_err(|source| ConfigError::Document {
        name: name.to_string(),
        source,
    })
}
