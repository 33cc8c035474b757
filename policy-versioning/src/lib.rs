//! Version resolution for loaded policies.
//!
//! [`PolicyVersionService`] indexes every loaded policy version and answers
//! version requests at major, minor or patch granularity.
//! [`PolicyVersionEventListener`] feeds it from load events.

mod listener;
mod query;
mod service;

pub use listener::PolicyVersionEventListener;
pub use query::{InvalidVersion, VersionQuery};
pub use service::PolicyVersionService;
