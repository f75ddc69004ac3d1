//! Async query error types.

use thiserror::Error;
use vizor_cache::CacheError;
use vizor_core::{RegistryError, VizorError};

/// Result type for async query operations.
pub type AsyncQueryResult<T> = Result<T, AsyncQueryError>;

/// Async query errors.
#[derive(Debug, Error)]
pub enum AsyncQueryError {
    /// Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The channel token cookie is absent.
    #[error("Token not present")]
    TokenMissing,

    /// The token failed verification or lacks a channel claim.
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    /// A job update omitted an identifier.
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// The worker queue refused the task.
    #[error("Task dispatch failed: {0}")]
    Dispatch(String),

    /// Stream backend error.
    #[error(transparent)]
    Backend(#[from] CacheError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RegistryError> for AsyncQueryError {
    fn from(err: RegistryError) -> Self {
        AsyncQueryError::Configuration(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for AsyncQueryError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        AsyncQueryError::Dispatch(err.to_string())
    }
}

impl From<redis::RedisError> for AsyncQueryError {
    fn from(err: redis::RedisError) -> Self {
        AsyncQueryError::Dispatch(err.to_string())
    }
}

impl From<AsyncQueryError> for VizorError {
    fn from(err: AsyncQueryError) -> Self {
        match err {
            AsyncQueryError::Configuration(msg) => VizorError::Configuration(msg),
            AsyncQueryError::TokenMissing => VizorError::TokenMissing("Token not present".to_string()),
            AsyncQueryError::TokenInvalid(msg) => VizorError::TokenInvalid(msg),
            AsyncQueryError::InvalidJob(msg) => VizorError::InvalidJob(msg),
            AsyncQueryError::Dispatch(msg) => VizorError::Dispatch(msg),
            AsyncQueryError::Backend(e) => e.into(),
            AsyncQueryError::Serialization(e) => e.into(),
        }
    }
}
