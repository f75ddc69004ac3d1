//! # Vizor Screenshot
//!
//! Full-height screenshots of dashboard and chart elements. Browsers only
//! capture what fits in the viewport, so tall elements are captured in
//! tiles and stitched into a single PNG.

pub mod compose;
pub mod error;
pub mod page;
pub mod tiled;

pub use compose::compose_tiles;
pub use error::{ScreenshotError, ScreenshotResult};
pub use page::{ClipRect, Page, ViewportSize};
pub use tiled::{clip_for, tile_count, ElementDimensions, ElementRect, TiledScreenshot};
