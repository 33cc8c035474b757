#![allow(dead_code)]

use policy_types::{EntityInfo, PolicyEntity};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn info(name: &str, major: u32, minor: u32, patch: u32) -> EntityInfo {
    EntityInfo::policy(name, major, minor, patch)
}

/// A decision policy with one rule and a defaults document.
pub fn decision_policy(info: EntityInfo, status: &str) -> PolicyEntity {
    let prefix = info.location_prefix().to_string();
    PolicyEntity::new(info)
        .with_item(format!("{prefix}policy-metadata.json"), format!(r#"{{"Status": "{status}"}}"#))
        .with_item(format!("{prefix}rules/decision.dmn"), "<definitions/>")
        .with_item(format!("{prefix}config/defaults.json"), r#"{"limit": 100}"#)
}

/// Polls `cond` until it holds, yielding to other tasks in between.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
