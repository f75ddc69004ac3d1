//! SSH tunnel error types.

use thiserror::Error;
use vizor_core::{RegistryError, VizorError};

/// Result type for SSH operations.
pub type SshResult<T> = Result<T, SshError>;

/// SSH tunnel errors.
#[derive(Debug, Error)]
pub enum SshError {
    /// The SSH server could not be reached or the tunnel could not be opened.
    #[error("SSH tunnel unavailable: {0}")]
    TunnelUnavailable(String),

    /// The SSH server rejected the credentials.
    #[error("SSH authentication failed for user '{0}'")]
    AuthFailed(String),

    /// None of the supported key types could parse the private key.
    #[error("Could not load private key, tried {}: {}", .attempted.join(", "), .reasons.join("; "))]
    KeyLoadFailed {
        /// Key types tried, in order.
        attempted: Vec<String>,
        /// Why each attempt failed.
        reasons: Vec<String>,
    },

    /// The database URL cannot be tunnelled.
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<RegistryError> for SshError {
    fn from(err: RegistryError) -> Self {
        SshError::Configuration(err.to_string())
    }
}

impl From<SshError> for VizorError {
    fn from(err: SshError) -> Self {
        match err {
            SshError::TunnelUnavailable(msg) => VizorError::TunnelUnavailable(msg),
            SshError::AuthFailed(user) => VizorError::AuthFailed(user),
            e @ SshError::KeyLoadFailed { .. } => VizorError::KeyLoadFailed(e.to_string()),
            SshError::InvalidDatabaseUrl(msg) => VizorError::Validation(msg),
            SshError::Configuration(msg) => VizorError::Configuration(msg),
        }
    }
}
