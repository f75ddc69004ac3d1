//! Vertical tile composition.

use crate::error::ScreenshotResult;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::warn;

/// Stacks PNG tiles top to bottom into one PNG.
///
/// No tiles yield empty bytes and a single tile is returned as-is. If the
/// tiles cannot be combined, the first tile is returned instead.
#[must_use]
pub fn compose_tiles(mut tiles: Vec<Vec<u8>>) -> Vec<u8> {
    match tiles.len() {
        0 => Vec::new(),
        1 => tiles.swap_remove(0),
        _ => match stack(&tiles) {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, tiles = tiles.len(), "Tile composition failed, using first tile");
                tiles.swap_remove(0)
            }
        },
    }
}

fn stack(tiles: &[Vec<u8>]) -> ScreenshotResult<Vec<u8>> {
    let images = tiles
        .iter()
        .map(|bytes| -> ScreenshotResult<RgbaImage> {
            Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
        })
        .collect::<ScreenshotResult<Vec<RgbaImage>>>()?;

    let width = images.iter().map(RgbaImage::width).max().unwrap_or(0);
    let height = images.iter().map(RgbaImage::height).sum();
    let mut canvas = RgbaImage::new(width, height);

    let mut offset: i64 = 0;
    for tile in &images {
        image::imageops::replace(&mut canvas, tile, 0, offset);
        offset += i64::from(tile.height());
    }

    let mut buffer = Cursor::new(Vec::new());
    canvas.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
