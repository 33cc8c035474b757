use crate::error::SdkResult;
use async_trait::async_trait;

/// Start/stop contract for host-managed components.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn initialize(&self) -> SdkResult<()>;

    /// Idempotent.
    async fn shutdown(&self);
}
