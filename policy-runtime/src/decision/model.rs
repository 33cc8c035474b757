//! Rule definitions extracted from a policy's `rules/` items.

use super::engine::RuleSetMetadata;
use policy_types::{ContentError, PatchIdentifier, PolicyEntity};
use regex::Regex;
use std::sync::LazyLock;

static RULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?rules/+([^/]+)$").expect("rule name regex is valid"));

static SLASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"//+").expect("slash regex is valid"));

/// Engine runtime id for a patch identifier: runs of `/` collapse to one.
pub fn sanitize_runtime_id(identifier: &str) -> String {
    SLASH_RUNS.replace_all(identifier, "/").trim().to_string()
}

/// One decision table, named by its file name under `rules/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinitionModel {
    name: String,
    content: String,
}

impl RuleDefinitionModel {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Builds a model from a content item path such as
    /// `a/b/1.0/rules/decision.dmn`.
    pub fn from_item(path: &str, content: &str) -> Result<Self, ContentError> {
        let name = RULE_NAME
            .captures(path)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ContentError::InvalidPath(path.to_string()))?;
        Ok(Self::new(name.as_str(), content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Every rule of one policy patch, plus the engine runtime id they load
/// under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinitionModelGroup {
    identifier: PatchIdentifier,
    runtime_id: String,
    metadata: RuleSetMetadata,
    rules: Vec<RuleDefinitionModel>,
}

impl RuleDefinitionModelGroup {
    pub fn from_policy(policy: &PolicyEntity) -> Result<Self, ContentError> {
        let info = policy.info();
        let identifier = info.patch_identifier();
        let mut rules = policy
            .rule_items()
            .map(|(path, content)| RuleDefinitionModel::from_item(path, content))
            .collect::<Result<Vec<_>, _>>()?;
        rules.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            runtime_id: sanitize_runtime_id(identifier.as_str()),
            metadata: RuleSetMetadata {
                identifier: identifier.to_string(),
                policy_name: info.name().to_string(),
                policy_version: info.version_string(),
            },
            identifier,
            rules,
        })
    }

    pub fn identifier(&self) -> &PatchIdentifier {
        &self.identifier
    }

    pub fn runtime_id(&self) -> &str {
        &self.runtime_id
    }

    pub fn metadata(&self) -> &RuleSetMetadata {
        &self.metadata
    }

    pub fn rules(&self) -> &[RuleDefinitionModel] {
        &self.rules
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn contains_rule_unit(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name)
    }
}
