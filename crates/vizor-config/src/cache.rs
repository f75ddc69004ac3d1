//! Cache backend configuration blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of cache backend selected by a configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Single-node Redis, optionally over TLS.
    Redis,
    /// Redis fronted by Sentinel, optionally with TLS to the master.
    RedisSentinel,
    /// Placeholder meaning "no cache"; async queries refuse to start with it.
    Null,
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::RedisSentinel => write!(f, "redis_sentinel"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Peer certificate verification mode for TLS connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslCertReqs {
    /// The server certificate must verify.
    #[default]
    Required,
    /// Verify when a certificate is presented.
    Optional,
    /// Skip verification entirely.
    None,
}

impl SslCertReqs {
    /// Returns true when the server certificate is not checked.
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A Sentinel node address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelAddress {
    /// Sentinel host.
    pub host: String,
    /// Sentinel port.
    #[serde(default = "default_sentinel_port")]
    pub port: u16,
}

fn default_sentinel_port() -> u16 {
    26379
}

impl SentinelAddress {
    /// Creates a sentinel address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Stream/cache backend block used by async queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend kind. Absent means "use the legacy Redis block".
    #[serde(default)]
    pub cache_type: Option<CacheType>,
    /// Redis host (plain and TLS variants).
    #[serde(default = "default_host")]
    pub host: String,
    /// Redis port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database index.
    #[serde(default)]
    pub db: i64,
    /// Password for the Redis node or Sentinel master.
    #[serde(default)]
    pub password: Option<String>,
    /// Prefix applied to every key.
    #[serde(default)]
    pub key_prefix: String,
    /// Default connect/response timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Enable TLS (to the master, in Sentinel mode).
    #[serde(default)]
    pub ssl: bool,
    /// Client certificate file (PEM).
    #[serde(default)]
    pub ssl_certfile: Option<String>,
    /// Client private key file (PEM).
    #[serde(default)]
    pub ssl_keyfile: Option<String>,
    /// Peer verification mode.
    #[serde(default)]
    pub ssl_cert_reqs: SslCertReqs,
    /// CA bundle file (PEM).
    #[serde(default)]
    pub ssl_ca_certs: Option<String>,
    /// Sentinel nodes.
    #[serde(default)]
    pub sentinels: Vec<SentinelAddress>,
    /// Sentinel master service name.
    #[serde(default)]
    pub master_name: Option<String>,
    /// Password for the Sentinel nodes themselves.
    #[serde(default)]
    pub sentinel_password: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: None,
            host: default_host(),
            port: default_port(),
            db: 0,
            password: None,
            key_prefix: String::new(),
            default_timeout_secs: default_timeout_secs(),
            ssl: false,
            ssl_certfile: None,
            ssl_keyfile: None,
            ssl_cert_reqs: SslCertReqs::default(),
            ssl_ca_certs: None,
            sentinels: Vec::new(),
            master_name: None,
            sentinel_password: None,
        }
    }
}

impl CacheConfig {
    /// Returns the default timeout as a Duration.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Returns true if this block is the null placeholder.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.cache_type == Some(CacheType::Null)
    }
}

/// Data cache block. Only its type is consulted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCacheConfig {
    /// Backend kind.
    #[serde(default)]
    pub cache_type: Option<CacheType>,
}

impl DataCacheConfig {
    /// Returns true if this block is the null placeholder.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.cache_type == Some(CacheType::Null)
    }
}

/// Plain Redis block used when the cache block names no backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRedisConfig {
    /// Redis host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Redis port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database index.
    #[serde(default)]
    pub db: i64,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Enable TLS.
    #[serde(default)]
    pub ssl: bool,
}

impl Default for LegacyRedisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db: 0,
            password: None,
            ssl: false,
        }
    }
}

impl From<&LegacyRedisConfig> for CacheConfig {
    fn from(legacy: &LegacyRedisConfig) -> Self {
        Self {
            cache_type: Some(CacheType::Redis),
            host: legacy.host.clone(),
            port: legacy.port,
            db: legacy.db,
            password: legacy.password.clone(),
            ssl: legacy.ssl,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_type_deserialization() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"cache_type": "redis_sentinel", "master_name": "mymaster"}"#)
                .unwrap();
        assert_eq!(config.cache_type, Some(CacheType::RedisSentinel));
        assert_eq!(config.master_name.as_deref(), Some("mymaster"));
        assert_eq!(config.port, 6379);
    }

    #[test]
    fn test_null_placeholder() {
        let config: CacheConfig = serde_json::from_str(r#"{"cache_type": "null"}"#).unwrap();
        assert!(config.is_null());
        assert!(!CacheConfig::default().is_null());
    }

    #[test]
    fn test_ssl_cert_reqs() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"ssl": true, "ssl_cert_reqs": "none"}"#).unwrap();
        assert!(config.ssl_cert_reqs.is_insecure());
        assert!(!SslCertReqs::default().is_insecure());
    }

    #[test]
    fn test_sentinel_default_port() {
        let addr: SentinelAddress = serde_json::from_str(r#"{"host": "s1"}"#).unwrap();
        assert_eq!(addr, SentinelAddress::new("s1", 26379));
    }

    #[test]
    fn test_legacy_conversion() {
        let legacy = LegacyRedisConfig {
            host: "redis.internal".to_string(),
            port: 6380,
            db: 2,
            password: Some("pw".to_string()),
            ssl: true,
        };
        let config = CacheConfig::from(&legacy);
        assert_eq!(config.cache_type, Some(CacheType::Redis));
        assert_eq!(config.host, "redis.internal");
        assert_eq!(config.db, 2);
        assert!(config.ssl);
    }
}
