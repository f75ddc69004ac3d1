//! Builds the configured stream backend.

use crate::backend::StreamBackend;
use crate::error::{CacheError, CacheResult};
use crate::redis::{RedisBackendParams, RedisStreamBackend};
use std::sync::Arc;
use tracing::info;
use vizor_config::{AppConfig, CacheConfig};

/// Selects and opens the stream backend for async queries.
pub struct StreamBackendFactory;

impl StreamBackendFactory {
    /// Picks the cache block to use.
    ///
    /// Both the cache and the data cache must be configured and non-null.
    /// When the cache block names no backend, the legacy Redis block is used.
    pub fn select(config: &AppConfig) -> CacheResult<CacheConfig> {
        if config.cache.is_null() || config.data_cache.is_null() {
            return Err(CacheError::Configuration(
                "Cache backends (cache, data_cache) must be configured and non-null \
                 in order to enable async queries"
                    .to_string(),
            ));
        }

        match config.cache.cache_type {
            Some(_) => Ok(config.cache.clone()),
            None => {
                info!("No cache backend type set, using legacy Redis configuration");
                Ok(CacheConfig::from(&config.legacy_redis))
            }
        }
    }

    /// Opens the backend selected by `config`.
    pub async fn create(config: &AppConfig) -> CacheResult<Arc<dyn StreamBackend>> {
        let cache = Self::select(config)?;
        let params = RedisBackendParams::from_cache_config(&cache)?;
        let backend = RedisStreamBackend::connect(&params).await?;
        Ok(Arc::new(backend))
    }
}
