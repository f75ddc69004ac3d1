//! Cache backend error types.

use thiserror::Error;
use vizor_core::VizorError;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache backend errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached within its retry/failover window.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A stream id or range bound could not be parsed, or did not increase.
    #[error("Invalid stream ID: {0}")]
    InvalidStreamId(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis error not related to connectivity.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl CacheError {
    /// Classifies a Redis error, folding connectivity failures into
    /// `BackendUnavailable` and rejected stream ids into `InvalidStreamId`.
    pub fn from_redis(err: redis::RedisError) -> Self {
        if is_connectivity_error(&err) {
            CacheError::BackendUnavailable(err.to_string())
        } else if is_invalid_stream_id(&err) {
            CacheError::InvalidStreamId(err.to_string())
        } else {
            CacheError::Redis(err)
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::BackendUnavailable(_))
    }
}

/// Errors after which a cached connection should be thrown away.
pub(crate) fn is_connectivity_error(err: &redis::RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || matches!(
            err.kind(),
            redis::ErrorKind::MasterDown | redis::ErrorKind::TryAgain | redis::ErrorKind::ReadOnly
        )
}

fn is_invalid_stream_id(err: &redis::RedisError) -> bool {
    err.kind() == redis::ErrorKind::ResponseError && err.to_string().contains(INVALID_STREAM_ID)
}

/// Server reply text for a malformed `XADD`/`XRANGE` id.
const INVALID_STREAM_ID: &str = "Invalid stream ID";

impl From<CacheError> for VizorError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::BackendUnavailable(msg) => VizorError::BackendUnavailable(msg),
            CacheError::Configuration(msg) => VizorError::Configuration(msg),
            CacheError::InvalidStreamId(msg) => VizorError::Validation(msg),
            CacheError::Redis(e) => VizorError::BackendUnavailable(e.to_string()),
        }
    }
}
