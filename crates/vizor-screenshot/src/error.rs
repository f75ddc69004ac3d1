//! Screenshot error types.

use thiserror::Error;
use vizor_core::VizorError;

/// Result type for screenshot operations.
pub type ScreenshotResult<T> = Result<T, ScreenshotError>;

/// Screenshot errors.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// The browser page failed a call.
    #[error("Page error: {0}")]
    Page(String),

    /// The target element did not appear.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Tiles could not be decoded or the result encoded.
    #[error("Image encoding error: {0}")]
    Encode(String),
}

impl From<image::ImageError> for ScreenshotError {
    fn from(err: image::ImageError) -> Self {
        ScreenshotError::Encode(err.to_string())
    }
}

impl From<ScreenshotError> for VizorError {
    fn from(err: ScreenshotError) -> Self {
        VizorError::Screenshot(err.to_string())
    }
}
