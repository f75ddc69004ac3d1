//! Tiled capture of elements taller than the viewport.
//!
//! The page is scrolled one viewport-height slice at a time; each slice is
//! clipped to the part of the element that is on screen, captured, and the
//! slices are stacked back together.

use crate::compose::compose_tiles;
use crate::error::{ScreenshotError, ScreenshotResult};
use crate::page::{ClipRect, Page, ViewportSize};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use vizor_config::ScreenshotConfig;

/// Document-relative geometry of the target element.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementDimensions {
    /// Full scroll height.
    pub height: f64,
    /// Offset from the top of the document.
    pub top: f64,
    /// Offset from the left of the document.
    pub left: f64,
    /// Rendered width.
    pub width: f64,
}

/// Viewport-relative bounding box of the target element.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Captures an element in viewport-sized tiles.
#[derive(Debug, Clone)]
pub struct TiledScreenshot {
    tile_height: u32,
    settle: Duration,
    locate_wait: Duration,
}

impl TiledScreenshot {
    /// Creates a composer with explicit timings.
    #[must_use]
    pub fn new(tile_height: u32, settle: Duration, locate_wait: Duration) -> Self {
        Self {
            tile_height,
            settle,
            locate_wait,
        }
    }

    /// Creates a composer from configuration.
    #[must_use]
    pub fn from_config(config: &ScreenshotConfig) -> Self {
        Self::new(
            config.tile_height,
            Duration::from_millis(config.settle_ms),
            Duration::from_millis(config.locate_wait_ms),
        )
    }

    /// Captures the first element with CSS class `element_class` as one PNG.
    ///
    /// Returns empty bytes when no tile had a visible area.
    pub async fn capture<P>(&self, page: &P, element_class: &str) -> ScreenshotResult<Vec<u8>>
    where
        P: Page + ?Sized,
    {
        let selector = format!(".{}", element_class);
        page.wait_for_selector(&selector, self.locate_wait).await?;

        let viewport = page
            .viewport_size()
            .ok_or_else(|| ScreenshotError::Page("Page has no viewport".to_string()))?;
        let element: ElementDimensions =
            evaluate_as(page, &dimensions_script(&selector)?, &selector).await?;

        let tile_height = f64::from(self.tile_height.min(viewport.height));
        let count = tile_count(element.height, tile_height);
        info!(
            selector = %selector,
            element_height = element.height,
            tile_height,
            tiles = count,
            "Capturing tiled screenshot"
        );

        let rect_script = rect_script(&selector)?;
        let mut tiles = Vec::with_capacity(count);
        for index in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let scroll_y = element.top + index as f64 * tile_height;
            page.evaluate(&format!("window.scrollTo(0, {})", scroll_y))
                .await?;
            page.wait_for_timeout(self.settle).await;

            let rect: ElementRect = evaluate_as(page, &rect_script, &selector).await?;
            match clip_for(&rect, viewport) {
                Some(clip) => {
                    debug!(tile = index, ?clip, "Capturing tile");
                    tiles.push(page.screenshot(clip).await?);
                }
                None => warn!(tile = index, ?rect, "Skipping tile with no visible area"),
            }
        }

        page.evaluate("window.scrollTo(0, 0)").await?;
        Ok(compose_tiles(tiles))
    }
}

/// Number of tiles needed to cover `element_height`.
#[must_use]
pub fn tile_count(element_height: f64, tile_height: f64) -> usize {
    if element_height <= 0.0 || tile_height <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (element_height / tile_height).ceil() as usize;
    count
}

/// Clip rectangle for the on-screen part of `rect`, if any.
#[must_use]
pub fn clip_for(rect: &ElementRect, viewport: ViewportSize) -> Option<ClipRect> {
    let viewport_width = f64::from(viewport.width);
    let viewport_height = f64::from(viewport.height);

    let x = rect.x.max(0.0);
    let y = rect.y.max(0.0);
    let width = rect.width.min(viewport_width - x);
    let height = if rect.y < 0.0 {
        (rect.y + rect.height).min(viewport_height)
    } else {
        rect.height.min(viewport_height - y)
    };

    (width > 0.0 && height > 0.0).then_some(ClipRect {
        x,
        y,
        width,
        height,
    })
}

fn dimensions_script(selector: &str) -> ScreenshotResult<String> {
    let selector = js_string(selector)?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({selector}); if (!el) return null; \
         const r = el.getBoundingClientRect(); \
         return {{ height: el.scrollHeight, top: r.top + window.scrollY, \
         left: r.left + window.scrollX, width: r.width }}; }})()"
    ))
}

fn rect_script(selector: &str) -> ScreenshotResult<String> {
    let selector = js_string(selector)?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({selector}); if (!el) return null; \
         const r = el.getBoundingClientRect(); \
         return {{ x: r.x, y: r.y, width: r.width, height: r.height }}; }})()"
    ))
}

fn js_string(value: &str) -> ScreenshotResult<String> {
    serde_json::to_string(value).map_err(|e| ScreenshotError::Page(e.to_string()))
}

async fn evaluate_as<P, T>(page: &P, script: &str, selector: &str) -> ScreenshotResult<T>
where
    P: Page + ?Sized,
    T: for<'de> Deserialize<'de>,
{
    let value = page.evaluate(script).await?;
    if value.is_null() {
        return Err(ScreenshotError::ElementNotFound(selector.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ScreenshotError::Page(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: ViewportSize = ViewportSize {
        width: 1600,
        height: 1000,
    };

    fn rect(x: f64, y: f64, width: f64, height: f64) -> ElementRect {
        ElementRect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_tile_count() {
        assert_eq!(tile_count(4500.0, 1000.0), 5);
        assert_eq!(tile_count(4000.0, 1000.0), 4);
        assert_eq!(tile_count(1.0, 2000.0), 1);
        assert_eq!(tile_count(0.0, 2000.0), 0);
    }

    #[test]
    fn test_clip_inside_viewport() {
        let clip = clip_for(&rect(10.0, 20.0, 800.0, 5000.0), VIEWPORT).unwrap();
        assert_eq!(
            clip,
            ClipRect {
                x: 10.0,
                y: 20.0,
                width: 800.0,
                height: 980.0
            }
        );
    }

    #[test]
    fn test_clip_element_overhanging_top() {
        let clip = clip_for(&rect(0.0, -4000.0, 800.0, 4500.0), VIEWPORT).unwrap();
        assert_eq!(clip.y, 0.0);
        assert_eq!(clip.height, 500.0);

        let clip = clip_for(&rect(0.0, -1000.0, 800.0, 4500.0), VIEWPORT).unwrap();
        assert_eq!(clip.height, 1000.0);
    }

    #[test]
    fn test_clip_clamps_width() {
        let clip = clip_for(&rect(-50.0, 0.0, 2000.0, 100.0), VIEWPORT).unwrap();
        assert_eq!(clip.x, 0.0);
        assert_eq!(clip.width, 1600.0);
    }

    #[test]
    fn test_clip_off_screen_is_skipped() {
        assert!(clip_for(&rect(1700.0, 0.0, 100.0, 100.0), VIEWPORT).is_none());
        assert!(clip_for(&rect(0.0, -600.0, 100.0, 500.0), VIEWPORT).is_none());
        assert!(clip_for(&rect(0.0, 0.0, 0.0, 100.0), VIEWPORT).is_none());
    }

    #[test]
    fn test_scripts_quote_selector() {
        let script = rect_script(".chart\"x").unwrap();
        assert!(script.contains(r#"document.querySelector(".chart\"x")"#));
    }
}
