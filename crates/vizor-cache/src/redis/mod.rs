//! Redis-backed stream backend.
//!
//! Three variants share one implementation: a single node over plain TCP,
//! a single node over TLS, and a Sentinel-resolved master (optionally TLS).
//! Single nodes go through a `ConnectionManager`, which reconnects on its
//! own; Sentinel masters go through [`sentinel::SentinelConnection`].

mod params;
mod sentinel;

pub use params::{MasterParams, RedisBackendParams, RedisTopology, TlsParams};

use crate::backend::{BackendKind, StreamBackend, StreamEntry, StreamFields, AUTO_ID};
use crate::error::{is_connectivity_error, CacheError, CacheResult};
use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager, ConnectionManagerConfig};
use redis::streams::{StreamMaxlen, StreamRangeReply};
use redis::{AsyncCommands, Client, RedisResult};
use sentinel::SentinelConnection;
use tracing::{debug, info};

/// Redis key builder for streams.
#[derive(Debug, Clone)]
pub struct StreamKeys {
    prefix: String,
}

impl StreamKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Full key of a stream.
    pub fn stream(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

enum Connection {
    Managed(ConnectionManager),
    Sentinel(SentinelConnection),
}

/// Stream backend over Redis.
pub struct RedisStreamBackend {
    connection: Connection,
    keys: StreamKeys,
    kind: BackendKind,
}

impl RedisStreamBackend {
    /// Opens a connection described by `params`.
    pub async fn connect(params: &RedisBackendParams) -> CacheResult<Self> {
        let kind = params.kind();
        info!(backend = %kind, "Connecting stream backend...");

        let connection = match &params.topology {
            RedisTopology::Single { host, port } => {
                let url = params.node_url(host, *port)?;
                let client = match params.master_params().tls {
                    Some(tls) => match tls.load_certificates()? {
                        Some(certs) => Client::build_with_tls(url.as_str(), certs),
                        None => Client::open(url.as_str()),
                    },
                    None => Client::open(url.as_str()),
                }
                .map_err(|e| CacheError::Configuration(format!("Invalid Redis config: {}", e)))?;

                let config = ConnectionManagerConfig::new()
                    .set_connection_timeout(params.timeout)
                    .set_response_timeout(params.timeout);
                let manager = client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| CacheError::BackendUnavailable(e.to_string()))?;

                Connection::Managed(manager)
            }
            RedisTopology::Sentinel { .. } => {
                let sentinel = SentinelConnection::build(params)?;
                // fail fast on an unreachable sentinel set
                sentinel.get().await?;
                Connection::Sentinel(sentinel)
            }
        };

        info!(backend = %kind, "Stream backend connected");

        Ok(Self {
            connection,
            keys: StreamKeys::new(&params.key_prefix),
            kind,
        })
    }

    async fn run_xadd(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        id: &str,
        maxlen: Option<usize>,
    ) -> CacheResult<String> {
        match &self.connection {
            Connection::Managed(manager) => {
                let mut conn = manager.clone();
                xadd_on(&mut conn, key, fields, id, maxlen)
                    .await
                    .map_err(CacheError::from_redis)
            }
            Connection::Sentinel(sentinel) => {
                let mut conn = sentinel.get().await?;
                let result = xadd_on(&mut conn, key, fields, id, maxlen).await;
                self.after_sentinel_call(sentinel, result).await
            }
        }
    }

    async fn run_xrange(
        &self,
        key: &str,
        start: &str,
        end: &str,
        count: Option<usize>,
    ) -> CacheResult<StreamRangeReply> {
        match &self.connection {
            Connection::Managed(manager) => {
                let mut conn = manager.clone();
                xrange_on(&mut conn, key, start, end, count)
                    .await
                    .map_err(CacheError::from_redis)
            }
            Connection::Sentinel(sentinel) => {
                let mut conn = sentinel.get().await?;
                let result = xrange_on(&mut conn, key, start, end, count).await;
                self.after_sentinel_call(sentinel, result).await
            }
        }
    }

    async fn after_sentinel_call<T>(
        &self,
        sentinel: &SentinelConnection,
        result: RedisResult<T>,
    ) -> CacheResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connectivity_error(&e) {
                    sentinel.invalidate().await;
                }
                Err(CacheError::from_redis(e))
            }
        }
    }
}

async fn xadd_on<C>(
    conn: &mut C,
    key: &str,
    fields: &[(&str, &str)],
    id: &str,
    maxlen: Option<usize>,
) -> RedisResult<String>
where
    C: ConnectionLike + Send + Sync,
{
    match maxlen {
        Some(n) => conn.xadd_maxlen(key, StreamMaxlen::Approx(n), id, fields).await,
        None => conn.xadd(key, id, fields).await,
    }
}

async fn xrange_on<C>(
    conn: &mut C,
    key: &str,
    start: &str,
    end: &str,
    count: Option<usize>,
) -> RedisResult<StreamRangeReply>
where
    C: ConnectionLike + Send + Sync,
{
    match count {
        Some(n) => conn.xrange_count(key, start, end, n).await,
        None => conn.xrange(key, start, end).await,
    }
}

fn into_entries(reply: StreamRangeReply) -> CacheResult<Vec<StreamEntry>> {
    reply
        .ids
        .into_iter()
        .map(|stream_id| {
            let fields = stream_id
                .map
                .iter()
                .map(|(name, value)| {
                    let value: String =
                        redis::from_redis_value(value).map_err(CacheError::from_redis)?;
                    Ok((name.clone(), value))
                })
                .collect::<CacheResult<StreamFields>>()?;
            Ok(StreamEntry::new(stream_id.id, fields))
        })
        .collect()
}

#[async_trait]
impl StreamBackend for RedisStreamBackend {
    async fn xadd(
        &self,
        stream: &str,
        fields: &StreamFields,
        id: &str,
        maxlen: Option<usize>,
    ) -> CacheResult<String> {
        let key = self.keys.stream(stream);
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let id = if id.is_empty() { AUTO_ID } else { id };

        let entry_id = self.run_xadd(&key, &pairs, id, maxlen).await?;
        debug!(stream = %key, id = %entry_id, "XADD");
        Ok(entry_id)
    }

    async fn xrange(
        &self,
        stream: &str,
        start: &str,
        end: &str,
        count: Option<usize>,
    ) -> CacheResult<Vec<StreamEntry>> {
        let key = self.keys.stream(stream);
        let reply = self.run_xrange(&key, start, end, count).await?;
        let entries = into_entries(reply)?;
        debug!(stream = %key, start = %start, count = entries.len(), "XRANGE");
        Ok(entries)
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}
