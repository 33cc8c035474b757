//! Configuration management for policies.
//!
//! A policy may ship a `config/` directory containing:
//! - `defaults.json`: values that always apply
//! - `features.json` and optional `features-<env>.json`: feature toggles,
//!   the latter overriding the former for one environment
//! - `schema.json`: optional, may list `required` default keys
//! - any other `*.json`: one use case, selected by business event
//!
//! [`ConfigManagementModel`] assembles these documents and resolves the
//! values for a business event through a [`ConfigMatchingStrategy`].

mod error;
mod model;
mod strategy;

pub use error::{ConfigError, ConfigResult};
pub use model::{ConfigManagementModel, ConfigMap, UseCase};
pub use strategy::{ConfigMatchingStrategy, ConfigSelection, MatchingStrategies};
