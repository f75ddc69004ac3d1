//! Component start-up.

use std::sync::Arc;
use tracing::info;
use vizor_async_queries::{
    async_query_manager, register_metrics, AsyncQueryManagerInterface, ManagerContext,
};
use vizor_config::AppConfig;
use vizor_core::VizorResult;
use vizor_ssh::{ssh_manager, SshManagerInterface};

/// Components the server hands to its routes.
pub struct Components {
    pub async_queries: Arc<dyn AsyncQueryManagerInterface>,
    pub ssh: Arc<dyn SshManagerInterface>,
}

/// Initializes the process-wide managers from `config`.
///
/// Fails when the async query cache is unusable or the SSH timeouts are
/// invalid; the server must not start half-configured.
pub async fn init_components(config: &AppConfig) -> VizorResult<Components> {
    if config.observability.metrics_enabled {
        register_metrics();
    }

    let async_queries = async_query_manager()
        .init_app(ManagerContext::new(config.clone()))
        .await?;
    let ssh = ssh_manager().init_app(&config.ssh_tunnel)?;
    info!(
        local_bind_address = %config.ssh_tunnel.local_bind_address,
        "SSH tunnel manager ready"
    );

    Ok(Components { async_queries, ssh })
}

/// Logs where the server is reachable.
pub fn print_startup_info(addr: &str) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("REST API:  http://{}", addr);
    info!("Events:    http://{}/api/v1/async_event/", addr);
    info!("Health:    http://{}/health", addr);
    info!("{}", separator);
}
