#![allow(dead_code)]

use policy_types::{Entity, EntityInfo, PolicyEntity, PolicyVersion};

pub const DEFAULTS: &str = r#"{"param-A": "Z", "param-B": "Y"}"#;
pub const USECASE_A: &str = r#"{"usecase": "A.A.A.A", "config": {"param-A": "A"}}"#;
pub const FEATURES_QA: &str = r#"{"param-B": "Y-QA"}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn info(name: &str, major: u32, minor: u32, patch: u32) -> EntityInfo {
    EntityInfo::policy(name, major, minor, patch)
}

pub fn version(name: &str, major: u32, minor: u32, patch: u32) -> PolicyVersion {
    PolicyVersion::new(name, major, minor, patch)
}

/// Assembles policy content under the entity's location prefix.
pub struct PolicyBuilder {
    entity: PolicyEntity,
}

impl PolicyBuilder {
    pub fn new(name: &str, major: u32, minor: u32, patch: u32) -> Self {
        let entity = PolicyEntity::new(info(name, major, minor, patch));
        Self { entity }.item("policy-metadata.json", r#"{"Status": "ACTIVE"}"#)
    }

    fn item(mut self, relative: &str, content: &str) -> Self {
        let path = format!("{}{relative}", self.entity.info().location_prefix());
        self.entity = self.entity.with_item(path, content);
        self
    }

    pub fn status(self, status: &str) -> Self {
        self.item("policy-metadata.json", &format!(r#"{{"Status": "{status}"}}"#))
    }

    pub fn config(self, file: &str, json: &str) -> Self {
        self.item(&format!("config/{file}"), json)
    }

    pub fn rule(self, file: &str) -> Self {
        self.item(&format!("rules/{file}"), &format!("<definitions name=\"{file}\"/>"))
    }

    pub fn build(self) -> Entity {
        self.entity.into()
    }
}
