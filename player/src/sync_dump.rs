//! Sync display capture to PNG

use std::path::Path;

use anyhow::{Context, Result};
use framefill_core::debug::{Canvas, MarkerRing, draw_sync_display};

/// Draw the sync display for `ring` into a fresh RGBA image.
pub fn render_sync_display(ring: &MarkerRing, buffer_size: usize, width: u32, height: u32) -> image::RgbaImage {
    let mut pixels = vec![0xFF00_0000u32; width as usize * height as usize];
    let mut canvas = Canvas::new(&mut pixels, width as usize, height as usize);
    draw_sync_display(&mut canvas, ring, buffer_size);

    image::RgbaImage::from_fn(width, height, |x, y| {
        let argb = pixels[y as usize * width as usize + x as usize];
        let [a, r, g, b] = argb.to_be_bytes();
        image::Rgba([r, g, b, a])
    })
}

/// Render the sync display and write it to `path` as PNG.
pub fn save_sync_display(ring: &MarkerRing, buffer_size: usize, path: &Path) -> Result<()> {
    let img = render_sync_display(ring, buffer_size, 960, 540);
    img.save(path)
        .with_context(|| format!("Failed to write sync display to {}", path.display()))?;
    tracing::info!("Sync display written to {}", path.display());
    Ok(())
}
