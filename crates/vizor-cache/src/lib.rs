//! # Vizor Cache
//!
//! Stream-capable cache backends for Vizor.
//!
//! Every backend exposes the same two stream operations, `xadd` and
//! `xrange`, through [`StreamBackend`]. The concrete variant is picked once
//! at startup from the `cache` configuration block:
//!
//! - single-node Redis over plain TCP
//! - single-node Redis over TLS
//! - Redis behind Sentinel, optionally with TLS to the master
//! - an in-process store used by tests and local development

pub mod backend;
pub mod error;
pub mod factory;
pub mod memory;
pub mod redis;

pub use backend::{BackendKind, StreamBackend, StreamEntry, StreamFields};
pub use error::{CacheError, CacheResult};
pub use factory::StreamBackendFactory;
pub use memory::InMemoryStreamBackend;
pub use crate::redis::{
    MasterParams, RedisBackendParams, RedisStreamBackend, RedisTopology, StreamKeys, TlsParams,
};
