//! SSH tunnel manager and its factory.

use crate::error::{SshError, SshResult};
use crate::tunnel::{SshTunnel, SshTunnelRecord, TunnelTimeouts};
use crate::url::{remote_target, rewrite_database_url};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::info;
use vizor_config::SshTunnelConfig;
use vizor_core::{ComponentRegistry, Interface};

/// Name the default manager is registered under.
pub const DEFAULT_SSH_MANAGER_CLASS: &str = "vizor.ssh.SshManager";

/// Opens tunnels for database connections.
#[async_trait]
pub trait SshManagerInterface: Interface {
    /// Opens a tunnel reaching the host and port of `database_url`.
    async fn create_tunnel(
        &self,
        record: &SshTunnelRecord,
        database_url: &str,
    ) -> SshResult<SshTunnel>;

    /// Rewrites `database_url` to go through `tunnel`.
    fn build_database_url(&self, database_url: &str, tunnel: &SshTunnel) -> SshResult<String> {
        rewrite_database_url(
            database_url,
            tunnel.local_bind_address(),
            tunnel.local_bind_port(),
        )
    }
}

/// Default tunnel manager.
#[derive(Debug, Clone)]
pub struct SshManager {
    local_bind_address: String,
    timeouts: TunnelTimeouts,
}

impl SshManager {
    /// Reads the bind address and timeouts from `config`.
    pub fn init(config: &SshTunnelConfig) -> SshResult<Self> {
        let timeouts = TunnelTimeouts::from_secs_f64(config.timeout_sec, config.packet_timeout_sec)?;
        info!(
            local_bind_address = %config.local_bind_address,
            connect_timeout = ?timeouts.connect,
            packet_timeout = ?timeouts.packet,
            "SSH manager initialized"
        );
        Ok(Self {
            local_bind_address: config.local_bind_address.clone(),
            timeouts,
        })
    }

    /// Timeouts every tunnel uses.
    #[must_use]
    pub fn timeouts(&self) -> TunnelTimeouts {
        self.timeouts
    }

    /// Address tunnels bind locally.
    #[must_use]
    pub fn local_bind_address(&self) -> &str {
        &self.local_bind_address
    }
}

#[async_trait]
impl SshManagerInterface for SshManager {
    async fn create_tunnel(
        &self,
        record: &SshTunnelRecord,
        database_url: &str,
    ) -> SshResult<SshTunnel> {
        let (host, port) = remote_target(database_url)?;
        SshTunnel::open(record, &host, port, &self.local_bind_address, self.timeouts).await
    }
}

type ManagerConstructor = SshResult<Arc<dyn SshManagerInterface>>;

/// Resolves and holds the configured tunnel manager.
pub struct SshManagerFactory {
    registry: RwLock<ComponentRegistry<SshTunnelConfig, ManagerConstructor>>,
    instance: RwLock<Option<Arc<dyn SshManagerInterface>>>,
}

impl SshManagerFactory {
    /// Factory with the default manager registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = ComponentRegistry::new();
        registry.register(DEFAULT_SSH_MANAGER_CLASS, |config: &SshTunnelConfig| {
            SshManager::init(config).map(|m| Arc::new(m) as Arc<dyn SshManagerInterface>)
        });
        Self {
            registry: RwLock::new(registry),
            instance: RwLock::new(None),
        }
    }

    /// Registers another implementation under `name`.
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(&SshTunnelConfig) -> ManagerConstructor + Send + Sync + 'static,
    {
        self.registry.write().register(name, constructor);
    }

    /// Builds the manager named by `config.manager_class` and stores it.
    pub fn init_app(&self, config: &SshTunnelConfig) -> SshResult<Arc<dyn SshManagerInterface>> {
        let manager = self.registry.read().resolve(&config.manager_class, config)??;
        *self.instance.write() = Some(Arc::clone(&manager));
        Ok(manager)
    }

    /// The initialized manager.
    pub fn instance(&self) -> SshResult<Arc<dyn SshManagerInterface>> {
        self.instance
            .read()
            .clone()
            .ok_or_else(|| SshError::Configuration("SSH manager is not initialized".to_string()))
    }
}

impl Default for SshManagerFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide factory.
pub fn ssh_manager() -> &'static SshManagerFactory {
    static FACTORY: OnceLock<SshManagerFactory> = OnceLock::new();
    FACTORY.get_or_init(SshManagerFactory::new)
}
