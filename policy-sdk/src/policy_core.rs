//! The assembled policy core.

use crate::config::PolicyCoreConfig;
use crate::error::SdkResult;
use crate::lifecycle::Lifecycle;
use async_trait::async_trait;
use policy_loading::{
    AggregateEntityLoadListener, ConfigStore, EmptyConfigStore, EntityLoadListener, LoadManagerConfig,
    PolicyLoadManager, PolicyLoadTarget,
};
use policy_runtime::{InvocationOutcome, PolicyInvoker, PolicyResultHandler, PolicyRuntimeContext, RuntimeResult};
use policy_versioning::{PolicyVersionEventListener, PolicyVersionService};
use std::sync::Arc;
use tracing::info;

/// Collects the pieces of a [`PolicyCore`].
pub struct PolicyCoreBuilder<C: PolicyRuntimeContext> {
    context: Arc<C>,
    config: PolicyCoreConfig,
    store: Arc<dyn ConfigStore>,
    listeners: Vec<Arc<dyn EntityLoadListener>>,
}

impl<C: PolicyRuntimeContext + 'static> PolicyCoreBuilder<C> {
    fn new(context: Arc<C>) -> Self {
        Self {
            context,
            config: PolicyCoreConfig::default(),
            store: Arc::new(EmptyConfigStore),
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PolicyCoreConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = store;
        self
    }

    /// Host listeners run after the version index has been updated, in the
    /// order they were added.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EntityLoadListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> PolicyCore<C> {
        let versions = Arc::new(PolicyVersionService::new());
        let mut publisher = AggregateEntityLoadListener::default()
            .with_listener(Arc::new(PolicyVersionEventListener::new(versions.clone())));
        for listener in self.listeners {
            publisher.push(listener);
        }

        let target: Arc<dyn PolicyLoadTarget> = self.context.clone();
        let manager = PolicyLoadManager::new(
            self.store,
            target,
            Arc::new(publisher),
            self.config.load_manager_config(),
        );
        let invoker = PolicyInvoker::new(self.context.clone(), versions.clone());

        PolicyCore {
            config: self.config,
            context: self.context,
            versions,
            manager,
            invoker,
        }
    }
}

/// Store, load manager, version index and runtime context wired together.
pub struct PolicyCore<C: PolicyRuntimeContext> {
    config: PolicyCoreConfig,
    context: Arc<C>,
    versions: Arc<PolicyVersionService>,
    manager: PolicyLoadManager,
    invoker: PolicyInvoker<C>,
}

impl<C: PolicyRuntimeContext + 'static> PolicyCore<C> {
    pub fn builder(context: Arc<C>) -> PolicyCoreBuilder<C> {
        PolicyCoreBuilder::new(context)
    }

    pub fn config(&self) -> &PolicyCoreConfig {
        &self.config
    }

    pub fn manager_config(&self) -> &LoadManagerConfig {
        self.manager.config()
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn versions(&self) -> &Arc<PolicyVersionService> {
        &self.versions
    }

    pub fn manager(&self) -> &PolicyLoadManager {
        &self.manager
    }

    pub fn invoker(&self) -> &PolicyInvoker<C> {
        &self.invoker
    }

    pub fn is_initialized(&self) -> bool {
        self.manager.is_initialized()
    }

    pub fn invoke(
        &self,
        address: &str,
        version: &str,
        request: &C::Request,
    ) -> RuntimeResult<InvocationOutcome<C::Response>> {
        self.invoker.invoke(address, version, request)
    }

    pub fn invoke_with<H>(&self, address: &str, version: &str, request: &C::Request, handler: &H) -> RuntimeResult<H::Output>
    where
        H: PolicyResultHandler<C::Response>,
    {
        self.invoker.invoke_with(address, version, request, handler)
    }
}

#[async_trait]
impl<C: PolicyRuntimeContext + 'static> Lifecycle for PolicyCore<C> {
    async fn initialize(&self) -> SdkResult<()> {
        self.manager.initialize().await?;
        info!(
            policies = self.context.loaded_entities().len(),
            versions = self.versions.len(),
            "Policy core initialized"
        );
        Ok(())
    }

    async fn shutdown(&self) {
        self.manager.stop().await;
        info!("Policy core stopped");
    }
}
