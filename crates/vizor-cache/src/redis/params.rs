//! Connection parameters for the Redis variants.

use crate::backend::BackendKind;
use crate::error::{CacheError, CacheResult};
use redis::sentinel::SentinelNodeConnectionInfo;
use redis::{RedisConnectionInfo, TlsCertificates, TlsMode};
use std::time::Duration;
use url::Url;
use vizor_config::{CacheConfig, CacheType, SentinelAddress, SslCertReqs};

/// TLS options for a Redis connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsParams {
    /// Client certificate file (PEM).
    pub certfile: Option<String>,
    /// Client private key file (PEM).
    pub keyfile: Option<String>,
    /// Peer verification mode.
    pub cert_reqs: SslCertReqs,
    /// CA bundle file (PEM).
    pub ca_certs: Option<String>,
}

impl TlsParams {
    /// Returns true when the server certificate is not checked.
    pub fn is_insecure(&self) -> bool {
        self.cert_reqs.is_insecure()
    }

    /// Reads the certificate files named by these options.
    ///
    /// Returns `None` when no files are configured and the platform roots apply.
    pub fn load_certificates(&self) -> CacheResult<Option<TlsCertificates>> {
        let client_tls = match (&self.certfile, &self.keyfile) {
            (Some(cert), Some(key)) => Some(redis::ClientTlsConfig {
                client_cert: read_pem(cert)?,
                client_key: read_pem(key)?,
            }),
            (None, None) => None,
            _ => {
                return Err(CacheError::Configuration(
                    "ssl_certfile and ssl_keyfile must be set together".to_string(),
                ))
            }
        };

        let root_cert = self.ca_certs.as_deref().map(read_pem).transpose()?;

        if client_tls.is_none() && root_cert.is_none() {
            return Ok(None);
        }

        Ok(Some(TlsCertificates {
            client_tls,
            root_cert,
        }))
    }
}

fn read_pem(path: &str) -> CacheResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| CacheError::Configuration(format!("Cannot read TLS file {}: {}", path, e)))
}

/// Parameters of the data-bearing connection (the node itself, or the
/// Sentinel master).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterParams {
    /// Database index.
    pub db: i64,
    /// Password.
    pub password: Option<String>,
    /// TLS options; absent entirely when TLS is disabled.
    pub tls: Option<TlsParams>,
}

impl MasterParams {
    /// Connection info understood by the driver.
    pub fn redis_connection_info(&self) -> RedisConnectionInfo {
        RedisConnectionInfo {
            db: self.db,
            password: self.password.clone(),
            ..RedisConnectionInfo::default()
        }
    }

    /// Sentinel-side description of how to reach the master.
    pub fn sentinel_node_info(&self) -> SentinelNodeConnectionInfo {
        SentinelNodeConnectionInfo {
            tls_mode: self.tls.as_ref().map(|tls| {
                if tls.is_insecure() {
                    TlsMode::Insecure
                } else {
                    TlsMode::Secure
                }
            }),
            redis_connection_info: Some(self.redis_connection_info()),
        }
    }
}

/// Where the data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisTopology {
    /// One node.
    Single {
        /// Host.
        host: String,
        /// Port.
        port: u16,
    },
    /// Nodes discovered through Sentinel.
    Sentinel {
        /// Sentinel nodes.
        sentinels: Vec<SentinelAddress>,
        /// Master service name.
        master_name: String,
        /// Password for the sentinels themselves.
        sentinel_password: Option<String>,
    },
}

/// Everything needed to open a Redis stream backend.
#[derive(Debug, Clone)]
pub struct RedisBackendParams {
    /// Single node or Sentinel.
    pub topology: RedisTopology,
    /// Database index.
    pub db: i64,
    /// Password for the data node.
    pub password: Option<String>,
    /// Prefix for stream keys.
    pub key_prefix: String,
    /// Connect and response timeout.
    pub timeout: Duration,
    /// Whether TLS is enabled for the data connection.
    pub ssl: bool,
    /// TLS options, honoured only when `ssl` is set.
    pub tls: TlsParams,
}

impl RedisBackendParams {
    /// Builds parameters from a cache block.
    pub fn from_cache_config(config: &CacheConfig) -> CacheResult<Self> {
        let topology = match config.cache_type {
            Some(CacheType::Redis) | None => RedisTopology::Single {
                host: config.host.clone(),
                port: config.port,
            },
            Some(CacheType::RedisSentinel) => {
                if config.sentinels.is_empty() {
                    return Err(CacheError::Configuration(
                        "Sentinel cache requires at least one sentinel".to_string(),
                    ));
                }
                let master_name = config
                    .master_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| {
                        CacheError::Configuration("Sentinel cache requires master_name".to_string())
                    })?;
                RedisTopology::Sentinel {
                    sentinels: config.sentinels.clone(),
                    master_name,
                    sentinel_password: config.sentinel_password.clone(),
                }
            }
            Some(CacheType::Null) => {
                return Err(CacheError::Configuration(
                    "Cannot build a Redis backend from a null cache block".to_string(),
                ))
            }
        };

        Ok(Self {
            topology,
            db: config.db,
            password: config.password.clone(),
            key_prefix: config.key_prefix.clone(),
            timeout: config.default_timeout(),
            ssl: config.ssl,
            tls: TlsParams {
                certfile: config.ssl_certfile.clone(),
                keyfile: config.ssl_keyfile.clone(),
                cert_reqs: config.ssl_cert_reqs,
                ca_certs: config.ssl_ca_certs.clone(),
            },
        })
    }

    /// Parameters for the data connection.
    ///
    /// TLS options are dropped entirely unless TLS is enabled; the driver
    /// treats their mere presence as a request to negotiate TLS.
    pub fn master_params(&self) -> MasterParams {
        MasterParams {
            db: self.db,
            password: self.password.clone(),
            tls: self.ssl.then(|| self.tls.clone()),
        }
    }

    /// Which variant these parameters select.
    pub fn kind(&self) -> BackendKind {
        match (&self.topology, self.ssl) {
            (RedisTopology::Single { .. }, false) => BackendKind::Redis,
            (RedisTopology::Single { .. }, true) => BackendKind::RedisTls,
            (RedisTopology::Sentinel { .. }, false) => BackendKind::RedisSentinel,
            (RedisTopology::Sentinel { .. }, true) => BackendKind::RedisSentinelTls,
        }
    }

    /// URL of a single data node: `redis://` or `rediss://`, with the
    /// `#insecure` fragment when peer verification is off.
    pub fn node_url(&self, host: &str, port: u16) -> CacheResult<String> {
        let master = self.master_params();
        let scheme = if master.tls.is_some() { "rediss" } else { "redis" };
        let mut url = Url::parse(&format!("{}://{}:{}/{}", scheme, host, port, master.db))
            .map_err(|e| CacheError::Configuration(format!("Invalid Redis address: {}", e)))?;

        if let Some(password) = master.password.as_deref() {
            url.set_password(Some(password)).map_err(|()| {
                CacheError::Configuration("Cannot set password on Redis URL".to_string())
            })?;
        }
        if master.tls.as_ref().is_some_and(TlsParams::is_insecure) {
            url.set_fragment(Some("insecure"));
        }

        Ok(url.to_string())
    }

    /// URLs of the sentinel nodes. Always plain TCP: TLS applies to the
    /// master only.
    pub fn sentinel_urls(&self) -> CacheResult<Vec<String>> {
        let RedisTopology::Sentinel {
            sentinels,
            sentinel_password,
            ..
        } = &self.topology
        else {
            return Ok(Vec::new());
        };

        sentinels
            .iter()
            .map(|node| {
                let mut url = Url::parse(&format!("redis://{}:{}", node.host, node.port))
                    .map_err(|e| {
                        CacheError::Configuration(format!("Invalid sentinel address: {}", e))
                    })?;
                if let Some(password) = sentinel_password.as_deref() {
                    url.set_password(Some(password)).map_err(|()| {
                        CacheError::Configuration("Cannot set password on sentinel URL".to_string())
                    })?;
                }
                Ok(url.to_string())
            })
            .collect()
    }
}
