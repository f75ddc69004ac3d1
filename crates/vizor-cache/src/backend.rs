//! Stream backend trait.

use crate::error::CacheResult;
use async_trait::async_trait;
use shaku::Interface;
use std::collections::BTreeMap;
use std::fmt;

/// Field map of one stream entry. Ordered so serialisation is canonical.
pub type StreamFields = BTreeMap<String, String>;

/// Backend-assigned id meaning "next id".
pub const AUTO_ID: &str = "*";
/// Range bound meaning "from the beginning".
pub const RANGE_START: &str = "-";
/// Range bound meaning "to the end".
pub const RANGE_END: &str = "+";

/// One entry read back from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Backend-assigned entry id (`<ms>-<seq>`).
    pub id: String,
    /// Entry fields.
    pub fields: StreamFields,
}

impl StreamEntry {
    /// Creates an entry.
    pub fn new(id: impl Into<String>, fields: StreamFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns a field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Which concrete store a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Single-node Redis.
    Redis,
    /// Single-node Redis over TLS.
    RedisTls,
    /// Redis behind Sentinel.
    RedisSentinel,
    /// Redis behind Sentinel with TLS to the master.
    RedisSentinelTls,
    /// In-process store.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::RedisTls => write!(f, "redis+tls"),
            Self::RedisSentinel => write!(f, "redis-sentinel"),
            Self::RedisSentinelTls => write!(f, "redis-sentinel+tls"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Append-only stream operations over a cache store.
///
/// Ids assigned for [`AUTO_ID`] must be strictly increasing within a stream
/// and ordered the way Redis orders them (`<ms>-<seq>`, compared numerically
/// per component).
#[async_trait]
pub trait StreamBackend: Interface + Send + Sync {
    /// Appends an entry and returns its id.
    ///
    /// `maxlen` trims the stream to approximately that many newest entries.
    async fn xadd(
        &self,
        stream: &str,
        fields: &StreamFields,
        id: &str,
        maxlen: Option<usize>,
    ) -> CacheResult<String>;

    /// Returns up to `count` entries with ids in `[start, end]`, ascending.
    async fn xrange(
        &self,
        stream: &str,
        start: &str,
        end: &str,
        count: Option<usize>,
    ) -> CacheResult<Vec<StreamEntry>>;

    /// Which store this backend talks to.
    fn kind(&self) -> BackendKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_field_lookup() {
        let mut fields = StreamFields::new();
        fields.insert("data".to_string(), "{}".to_string());
        let entry = StreamEntry::new("1-0", fields);
        assert_eq!(entry.field("data"), Some("{}"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::RedisSentinelTls.to_string(), "redis-sentinel+tls");
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }
}
