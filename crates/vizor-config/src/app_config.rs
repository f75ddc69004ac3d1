//! Application configuration structures.

use crate::{CacheConfig, DataCacheConfig, LegacyRedisConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vizor_core::telemetry::TelemetryConfig;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Stream/cache backend for async queries.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Data cache block.
    #[serde(default)]
    pub data_cache: DataCacheConfig,

    /// Fallback Redis block.
    #[serde(default)]
    pub legacy_redis: LegacyRedisConfig,

    /// Async query channel and stream configuration.
    #[serde(default)]
    pub async_queries: AsyncQueriesConfig,

    /// SSH tunnel configuration.
    #[serde(default)]
    pub ssh_tunnel: SshTunnelConfig,

    /// Tiled screenshot configuration.
    #[serde(default)]
    pub screenshot: ScreenshotConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "vizor".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP host.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
            request_timeout_secs: 30,
            cors_enabled: false,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    /// Returns the HTTP server address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `SameSite` attribute for the channel cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSitePolicy {
    /// `SameSite=None`
    #[serde(alias = "none")]
    None,
    /// `SameSite=Lax`
    #[serde(alias = "lax")]
    Lax,
    /// `SameSite=Strict`
    #[serde(alias = "strict")]
    Strict,
}

/// Worker task queue connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Redis URL of the broker.
    pub url: String,
    /// Key prefix for queue lists.
    pub key_prefix: String,
    /// Connection pool size.
    pub pool_size: usize,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/1".to_string(),
            key_prefix: "vizor".to_string(),
            pool_size: 10,
        }
    }
}

/// Async query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncQueriesConfig {
    /// HMAC secret for channel tokens. Must be at least 32 bytes.
    pub jwt_secret: String,
    /// Name of the channel token cookie.
    pub jwt_cookie_name: String,
    /// `Secure` cookie attribute.
    pub jwt_cookie_secure: bool,
    /// `SameSite` cookie attribute; omitted when unset.
    #[serde(default)]
    pub jwt_cookie_samesite: Option<SameSitePolicy>,
    /// `Domain` cookie attribute; omitted when unset.
    #[serde(default)]
    pub jwt_cookie_domain: Option<String>,
    /// Prefix for stream names.
    pub stream_prefix: String,
    /// Retention cap for per-channel streams.
    pub stream_limit: usize,
    /// Retention cap for the firehose stream.
    pub stream_limit_firehose: usize,
    /// Install the cookie-issuing response hook.
    pub register_request_handlers: bool,
    /// Dotted name of the manager implementation.
    pub manager_class: String,
    /// Polling interval advertised to clients, in milliseconds.
    pub polling_delay_ms: u64,
    /// Worker queue connection.
    #[serde(default)]
    pub task_queue: TaskQueueConfig,
}

impl Default for AsyncQueriesConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production-with-32-plus-bytes".to_string(),
            jwt_cookie_name: "async-token".to_string(),
            jwt_cookie_secure: false,
            jwt_cookie_samesite: None,
            jwt_cookie_domain: None,
            stream_prefix: "async-events-".to_string(),
            stream_limit: 1000,
            stream_limit_firehose: 1_000_000,
            register_request_handlers: true,
            manager_class: "vizor.async_queries.AsyncQueryManager".to_string(),
            polling_delay_ms: 500,
            task_queue: TaskQueueConfig::default(),
        }
    }
}

impl AsyncQueriesConfig {
    /// Returns the polling delay as a Duration.
    #[must_use]
    pub const fn polling_delay(&self) -> Duration {
        Duration::from_millis(self.polling_delay_ms)
    }
}

/// SSH tunnel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshTunnelConfig {
    /// Dotted name of the tunnel manager implementation.
    pub manager_class: String,
    /// Local address the forwarded port binds to.
    pub local_bind_address: String,
    /// Connect/open timeout in fractional seconds.
    pub timeout_sec: f64,
    /// Per-packet timeout in fractional seconds.
    pub packet_timeout_sec: f64,
}

impl Default for SshTunnelConfig {
    fn default() -> Self {
        Self {
            manager_class: "vizor.ssh.SshManager".to_string(),
            local_bind_address: "127.0.0.1".to_string(),
            timeout_sec: 10.0,
            packet_timeout_sec: 1.0,
        }
    }
}

/// Tiled screenshot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Requested tile height in pixels.
    pub tile_height: u32,
    /// Settle interval after each scroll, in milliseconds.
    pub settle_ms: u64,
    /// How long to wait for the target element, in milliseconds.
    pub locate_wait_ms: u64,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            tile_height: 2000,
            settle_ms: 2000,
            locate_wait_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
    /// Enable metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl ObservabilityConfig {
    /// Builds the logging configuration for this deployment.
    #[must_use]
    pub fn telemetry(&self, service_name: &str) -> TelemetryConfig {
        TelemetryConfig {
            service_name: service_name.to_string(),
            json_logs: self.json_logs,
            log_filter: format!(
                "{},vizor=debug,tower_http=debug",
                self.log_level.to_lowercase()
            ),
            console_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_async_queries() {
        let config = AsyncQueriesConfig::default();
        assert_eq!(config.jwt_cookie_name, "async-token");
        assert_eq!(config.stream_prefix, "async-events-");
        assert_eq!(config.stream_limit, 1000);
        assert_eq!(config.stream_limit_firehose, 1_000_000);
        assert!(config.register_request_handlers);
        assert!(config.jwt_secret.len() >= 32);
        assert_eq!(config.polling_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_ssh_tunnel() {
        let config = SshTunnelConfig::default();
        assert_eq!(config.local_bind_address, "127.0.0.1");
        assert!((config.timeout_sec - 10.0).abs() < f64::EPSILON);
        assert!((config.packet_timeout_sec - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_samesite_aliases() {
        let lax: SameSitePolicy = serde_json::from_str("\"Lax\"").unwrap();
        let strict: SameSitePolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(lax, SameSitePolicy::Lax);
        assert_eq!(strict, SameSitePolicy::Strict);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8088");
    }

    #[test]
    fn test_telemetry_filter_from_log_level() {
        let observability = ObservabilityConfig {
            log_level: "WARN".to_string(),
            json_logs: true,
            metrics_enabled: false,
        };
        let telemetry = observability.telemetry("vizor-test");
        assert!(telemetry.log_filter.starts_with("warn,"));
        assert!(telemetry.json_logs);
        assert_eq!(telemetry.service_name, "vizor-test");
    }
}
