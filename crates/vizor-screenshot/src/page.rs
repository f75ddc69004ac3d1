//! Browser page abstraction.

use crate::error::ScreenshotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Screenshot clip rectangle, viewport-relative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The subset of a browser automation page the composer drives.
#[async_trait]
pub trait Page: Send + Sync {
    /// Current viewport, if one is set.
    fn viewport_size(&self) -> Option<ViewportSize>;

    /// Runs `script` in the page and returns its JSON result.
    async fn evaluate(&self, script: &str) -> ScreenshotResult<Value>;

    /// Waits until `selector` matches an element.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> ScreenshotResult<()>;

    /// PNG screenshot of `clip`.
    async fn screenshot(&self, clip: ClipRect) -> ScreenshotResult<Vec<u8>>;

    /// Sleeps inside the page's event loop.
    async fn wait_for_timeout(&self, duration: Duration);
}
