//! Process-wide async query manager.
//!
//! `async_queries.manager_class` names the implementation; the factory
//! resolves it through a [`ComponentRegistry`], initializes it once and
//! hands out the shared instance afterwards.

use crate::error::{AsyncQueryError, AsyncQueryResult};
use crate::manager::{AsyncQueryManager, AsyncQueryManagerInterface, ManagerContext};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::info;
use vizor_core::ComponentRegistry;

/// Name the default manager is registered under.
pub const DEFAULT_MANAGER_CLASS: &str = "vizor.async_queries.AsyncQueryManager";

/// Pending construction of a manager.
pub type ManagerFuture = BoxFuture<'static, AsyncQueryResult<Arc<dyn AsyncQueryManagerInterface>>>;

/// Resolves, initializes and holds the manager.
pub struct AsyncQueryManagerFactory {
    registry: RwLock<ComponentRegistry<ManagerContext, ManagerFuture>>,
    instance: RwLock<Option<Arc<dyn AsyncQueryManagerInterface>>>,
}

impl AsyncQueryManagerFactory {
    /// Factory with the default manager registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = ComponentRegistry::new();
        registry.register(DEFAULT_MANAGER_CLASS, |ctx: &ManagerContext| -> ManagerFuture {
            let ctx = ctx.clone();
            Box::pin(async move {
                let manager = AsyncQueryManager::init(ctx).await?;
                Ok(Arc::new(manager) as Arc<dyn AsyncQueryManagerInterface>)
            })
        });

        Self {
            registry: RwLock::new(registry),
            instance: RwLock::new(None),
        }
    }

    /// Registers another manager implementation under `name`.
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(&ManagerContext) -> ManagerFuture + Send + Sync + 'static,
    {
        self.registry.write().register(name, constructor);
    }

    /// Builds the configured manager and stores it as the instance.
    pub async fn init_app(
        &self,
        ctx: ManagerContext,
    ) -> AsyncQueryResult<Arc<dyn AsyncQueryManagerInterface>> {
        let class = ctx.config.async_queries.manager_class.clone();
        let pending = self.registry.read().resolve(&class, &ctx)?;
        let manager = pending.await?;

        *self.instance.write() = Some(Arc::clone(&manager));
        info!(manager_class = %class, "Async query manager ready");
        Ok(manager)
    }

    /// The initialized manager.
    pub fn instance(&self) -> AsyncQueryResult<Arc<dyn AsyncQueryManagerInterface>> {
        self.instance.read().clone().ok_or_else(|| {
            AsyncQueryError::Configuration("Async query manager is not initialized".to_string())
        })
    }

    /// True once `init_app` has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.instance.read().is_some()
    }
}

impl Default for AsyncQueryManagerFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide factory.
pub fn async_query_manager() -> &'static AsyncQueryManagerFactory {
    static FACTORY: OnceLock<AsyncQueryManagerFactory> = OnceLock::new();
    FACTORY.get_or_init(AsyncQueryManagerFactory::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MockTaskQueue;
    use vizor_cache::InMemoryStreamBackend;
    use vizor_config::AppConfig;

    fn context(class: &str) -> ManagerContext {
        let mut config = AppConfig::default();
        config.async_queries.jwt_secret = "s".repeat(40);
        config.async_queries.manager_class = class.to_string();
        ManagerContext::new(config)
            .with_backend(Arc::new(InMemoryStreamBackend::new()))
            .with_task_queue(Arc::new(MockTaskQueue::new()))
    }

    #[tokio::test]
    async fn test_instance_before_init() {
        let factory = AsyncQueryManagerFactory::new();
        assert!(!factory.is_initialized());
        assert!(matches!(
            factory.instance(),
            Err(AsyncQueryError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_init_default_manager() {
        let factory = AsyncQueryManagerFactory::new();
        let manager = factory.init_app(context(DEFAULT_MANAGER_CLASS)).await.unwrap();

        let instance = factory.instance().unwrap();
        assert!(Arc::ptr_eq(&manager, &instance));
        assert_eq!(instance.cookie_name(), "async-token");
    }

    #[tokio::test]
    async fn test_unknown_class_is_configuration_error() {
        let factory = AsyncQueryManagerFactory::new();
        let err = factory
            .init_app(context("vizor.async_queries.Missing"))
            .await
            .err().unwrap();
        assert!(err.to_string().contains("Missing"));
        assert!(!factory.is_initialized());

        let err = factory.init_app(context("")).await.err().unwrap();
        assert!(matches!(err, AsyncQueryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_short_secret_fails_init() {
        let factory = AsyncQueryManagerFactory::new();
        let mut ctx = context(DEFAULT_MANAGER_CLASS);
        ctx.config.async_queries.jwt_secret = "short".to_string();

        assert!(factory.init_app(ctx).await.is_err());
        assert!(!factory.is_initialized());
    }

    #[tokio::test]
    async fn test_custom_registration() {
        let factory = AsyncQueryManagerFactory::new();
        factory.register("plugins.managers.Custom", |ctx: &ManagerContext| -> ManagerFuture {
            let ctx = ctx.clone();
            Box::pin(async move {
                let mut ctx = ctx;
                ctx.config.async_queries.jwt_cookie_name = "custom".to_string();
                let manager = AsyncQueryManager::init(ctx).await?;
                Ok(Arc::new(manager) as Arc<dyn AsyncQueryManagerInterface>)
            })
        });

        let manager = factory
            .init_app(context("plugins.managers.Custom"))
            .await
            .unwrap();
        assert_eq!(manager.cookie_name(), "custom");
    }
}
