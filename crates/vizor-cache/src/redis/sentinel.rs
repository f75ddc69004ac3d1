//! Sentinel-resolved master connection.

use crate::error::{CacheError, CacheResult};
use redis::aio::MultiplexedConnection;
use redis::sentinel::{SentinelClient, SentinelServerType};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::params::{RedisBackendParams, RedisTopology};

/// Connection to whichever node Sentinel currently reports as master.
///
/// The resolved connection is cached and thrown away after a connectivity
/// failure, so the next call asks Sentinel again and follows a failover.
pub(crate) struct SentinelConnection {
    client: Mutex<SentinelClient>,
    current: Mutex<Option<MultiplexedConnection>>,
    master_name: String,
    timeout: Duration,
}

impl SentinelConnection {
    pub(crate) fn build(params: &RedisBackendParams) -> CacheResult<Self> {
        let RedisTopology::Sentinel { master_name, .. } = &params.topology else {
            return Err(CacheError::Configuration(
                "Sentinel connection requires a sentinel topology".to_string(),
            ));
        };

        let master = params.master_params();
        if master.tls.as_ref().is_some_and(|tls| tls.certfile.is_some()) {
            warn!(
                master_name = %master_name,
                "Client certificates are not presented to Sentinel-resolved masters"
            );
        }

        let client = SentinelClient::build(
            params.sentinel_urls()?,
            master_name.clone(),
            Some(master.sentinel_node_info()),
            SentinelServerType::Master,
        )
        .map_err(|e| CacheError::Configuration(format!("Invalid sentinel setup: {}", e)))?;

        Ok(Self {
            client: Mutex::new(client),
            current: Mutex::new(None),
            master_name: master_name.clone(),
            timeout: params.timeout,
        })
    }

    /// Returns a handle to the current master, resolving it if needed.
    pub(crate) async fn get(&self) -> CacheResult<MultiplexedConnection> {
        let mut current = self.current.lock().await;
        if let Some(conn) = current.as_ref() {
            return Ok(conn.clone());
        }

        debug!(master_name = %self.master_name, "Resolving master through sentinel");
        let mut client = self.client.lock().await;
        let conn = tokio::time::timeout(self.timeout, client.get_async_connection())
            .await
            .map_err(|_| {
                CacheError::BackendUnavailable(format!(
                    "Timed out resolving sentinel master '{}'",
                    self.master_name
                ))
            })?
            .map_err(CacheError::from_redis)?;

        info!(master_name = %self.master_name, "Connected to sentinel master");
        *current = Some(conn.clone());
        Ok(conn)
    }

    /// Drops the cached master connection.
    pub(crate) async fn invalidate(&self) {
        if self.current.lock().await.take().is_some() {
            warn!(master_name = %self.master_name, "Dropped master connection after failure");
        }
    }
}
