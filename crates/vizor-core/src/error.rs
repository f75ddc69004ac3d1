//! Unified error types for all layers of the application.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Vizor.
///
/// Each subsystem crate defines its own `thiserror` enum and converts into
/// this one at the seam where errors leave the crate (HTTP handlers, the
/// server binary). The variants follow the error taxonomy of the async
/// query subsystem: configuration, channel authentication, job submission,
/// backend, and SSH key material.
#[derive(Error, Debug)]
pub enum VizorError {
    // ============ Configuration Errors ============
    /// Fatal at startup: missing cache config, short secret, unknown class name
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Channel Authentication Errors ============
    /// The channel token cookie is absent
    #[error("Token missing: {0}")]
    TokenMissing(String),

    /// The channel token failed verification or lacks a channel claim
    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    // ============ Job Errors ============
    /// A job metadata update omitted `channel_id` or `job_id`
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// The worker queue refused a task
    #[error("Task dispatch failed: {0}")]
    Dispatch(String),

    // ============ Backend Errors ============
    /// The stream store could not be reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    // ============ SSH Errors ============
    /// The SSH server could not be reached
    #[error("Tunnel unavailable: {0}")]
    TunnelUnavailable(String),

    /// The SSH server rejected the credentials
    #[error("SSH authentication failed: {0}")]
    AuthFailed(String),

    /// No supported key type could parse the private key
    #[error("Key load failed: {0}")]
    KeyLoadFailed(String),

    // ============ Rendering Errors ============
    /// Screenshot capture or composition failed
    #[error("Screenshot error: {0}")]
    Screenshot(String),

    // ============ Generic Errors ============
    /// Caller supplied invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VizorError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::TokenMissing(_) | Self::TokenInvalid(_) => 401,
            Self::InvalidJob(_) | Self::Validation(_) => 400,
            Self::AuthFailed(_) => 403,
            Self::BackendUnavailable(_) | Self::TunnelUnavailable(_) => 503,
            Self::Dispatch(_) => 502,
            Self::Configuration(_)
            | Self::KeyLoadFailed(_)
            | Self::Screenshot(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::TokenMissing(_) => "TOKEN_MISSING",
            Self::TokenInvalid(_) => "TOKEN_INVALID",
            Self::InvalidJob(_) => "INVALID_JOB",
            Self::Dispatch(_) => "DISPATCH_FAILED",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::TunnelUnavailable(_) => "TUNNEL_UNAVAILABLE",
            Self::AuthFailed(_) => "SSH_AUTH_FAILED",
            Self::KeyLoadFailed(_) => "KEY_LOAD_FAILED",
            Self::Screenshot(_) => "SCREENSHOT_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Checks if the caller may reasonably retry the operation.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable(_) | Self::TunnelUnavailable(_) | Self::Dispatch(_)
        )
    }
}

impl From<serde_json::Error> for VizorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response from a `VizorError`.
    #[must_use]
    pub fn from_error(error: &VizorError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&VizorError> for ErrorResponse {
    fn from(error: &VizorError) -> Self {
        Self::from_error(error)
    }
}
