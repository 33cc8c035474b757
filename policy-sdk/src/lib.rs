//! Host-facing entry point for the policy runtime.
//!
//! A host picks a runtime context, points a [`PolicyCore`] at its config
//! store and drives it through [`Lifecycle`]:
//!
//! ```ignore
//! let config = PolicyCoreConfig::load_from("policy-core.toml");
//! let context = Arc::new(config.config_runtime_context());
//! let core = PolicyCore::builder(context)
//!     .with_config(config)
//!     .with_store(store)
//!     .build();
//! core.initialize().await?;
//! let outcome = core.invoke("payments/limits", "2", &ConfigPolicyRequest::new("card.purchase"))?;
//! ```

mod config;
mod error;
mod lifecycle;
mod policy_core;

pub use config::PolicyCoreConfig;
pub use error::{SdkError, SdkResult};
pub use lifecycle::Lifecycle;
pub use policy_core::{PolicyCore, PolicyCoreBuilder};
