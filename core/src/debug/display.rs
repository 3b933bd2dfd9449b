//! Audio sync display drawn into a software framebuffer
//!
//! Every marker is drawn as vertical lines along a horizontal axis that
//! represents the device ring buffer: x = (sample mod buffer_size) scaled to
//! the drawable width. Completed frames draw their flip cursors across the
//! lower band; the most recent frame also draws its full pre-write state
//! in the top band so the prediction can be compared with what happened.

use super::markers::{DebugMarker, MarkerRing};
use crate::cursor::SampleCursor;

/// Pixel colors (0xAARRGGBB)
pub mod colors {
    pub const PLAY: u32 = 0xFFFF_FFFF;
    pub const WRITE: u32 = 0xFFFF_0000;
    pub const EXPECTED_FLIP: u32 = 0xFFFF_FF00;
    pub const OUTPUT_START: u32 = 0xFF00_00FF;
    pub const OUTPUT_END: u32 = 0xFF00_FF00;
    pub const BOUNDS: u32 = 0xFF40_4040;
}

/// A mutable view of a 32-bit pixel buffer.
pub struct Canvas<'a> {
    pub pixels: &'a mut [u32],
    pub width: usize,
    pub height: usize,
    /// Pixels per row (>= width)
    pub pitch: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(pixels: &'a mut [u32], width: usize, height: usize) -> Self {
        Self {
            pixels,
            width,
            height,
            pitch: width,
        }
    }

    /// Draw a vertical line at `x` covering rows `top..bottom`, clipped.
    pub fn vline(&mut self, x: usize, top: usize, bottom: usize, color: u32) {
        if x >= self.width {
            return;
        }
        let bottom = bottom.min(self.height);
        for y in top..bottom {
            if let Some(px) = self.pixels.get_mut(y * self.pitch + x) {
                *px = color;
            }
        }
    }
}

/// Layout of the sync display.
#[derive(Debug, Clone, Copy)]
pub struct SyncDisplay {
    pub pad_x: usize,
    pub pad_y: usize,
    /// Height of one marker row
    pub line_height: usize,
}

impl Default for SyncDisplay {
    fn default() -> Self {
        Self {
            pad_x: 16,
            pad_y: 16,
            line_height: 64,
        }
    }
}

impl SyncDisplay {
    /// Map a cursor onto the x axis for a ring of `buffer_size` frames.
    pub fn cursor_x(&self, canvas_width: usize, cursor: SampleCursor, buffer_size: usize) -> usize {
        let drawable = canvas_width.saturating_sub(2 * self.pad_x);
        let fraction = cursor.ring_fraction(buffer_size);
        self.pad_x + (fraction * drawable as f32) as usize
    }

    /// Draw all markers in `ring` for a device ring of `buffer_size` frames.
    pub fn draw(&self, canvas: &mut Canvas<'_>, ring: &MarkerRing, buffer_size: usize) {
        if buffer_size == 0 || canvas.width <= 2 * self.pad_x {
            return;
        }

        let top = self.pad_y;
        let bottom = canvas.height.saturating_sub(self.pad_y);
        if bottom <= top {
            return;
        }

        // Ring buffer bounds
        canvas.vline(self.pad_x, top, bottom, colors::BOUNDS);
        canvas.vline(canvas.width - self.pad_x, top, bottom, colors::BOUNDS);

        let detail_bottom = (top + self.line_height).min(bottom);
        for marker in ring.completed() {
            self.draw_flip(canvas, marker, buffer_size, detail_bottom, bottom);
        }

        if let Some(latest) = ring.latest() {
            self.draw_output(canvas, latest, buffer_size, top, detail_bottom);
        }
    }

    fn draw_flip(
        &self,
        canvas: &mut Canvas<'_>,
        marker: &DebugMarker,
        buffer_size: usize,
        top: usize,
        bottom: usize,
    ) {
        let width = canvas.width;
        let play_x = self.cursor_x(width, marker.flip_play_cursor, buffer_size);
        let write_x = self.cursor_x(width, marker.flip_write_cursor, buffer_size);
        canvas.vline(play_x, top, bottom, colors::PLAY);
        canvas.vline(write_x, top, bottom, colors::WRITE);
    }

    fn draw_output(
        &self,
        canvas: &mut Canvas<'_>,
        marker: &DebugMarker,
        buffer_size: usize,
        top: usize,
        bottom: usize,
    ) {
        let width = canvas.width;
        let end = marker.output_location + marker.output_sample_count as i64;
        let lines = [
            (marker.output_play_cursor, colors::PLAY),
            (marker.output_write_cursor, colors::WRITE),
            (marker.output_location, colors::OUTPUT_START),
            (end, colors::OUTPUT_END),
            (marker.expected_flip_play_cursor, colors::EXPECTED_FLIP),
        ];
        for (cursor, color) in lines {
            let x = self.cursor_x(width, cursor, buffer_size);
            canvas.vline(x, top, bottom, color);
        }
    }
}

/// Draw the sync display with the default layout.
pub fn draw_sync_display(canvas: &mut Canvas<'_>, ring: &MarkerRing, buffer_size: usize) {
    SyncDisplay::default().draw(canvas, ring, buffer_size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{FrameFillPlan, LatencyRegime};

    fn recorded_ring() -> MarkerRing {
        let mut ring = MarkerRing::new();
        ring.record_output(&FrameFillPlan {
            play_cursor: SampleCursor::new(1_200),
            write_cursor: SampleCursor::new(1_500),
            safe_write_cursor: SampleCursor::new(1_766),
            expected_frame_boundary: SampleCursor::new(2_000),
            target_cursor: SampleCursor::new(2_800),
            regime: LatencyRegime::Low,
            samples_to_write: 1_300,
        });
        ring.record_flip(SampleCursor::new(2_400), SampleCursor::new(2_800));
        ring
    }

    #[test]
    fn test_cursor_x_maps_ring_offset() {
        let display = SyncDisplay::default();
        // 232 drawable pixels
        assert_eq!(display.cursor_x(264, SampleCursor::new(0), 4_800), 16);
        assert_eq!(display.cursor_x(264, SampleCursor::new(2_400), 4_800), 16 + 116);
        assert_eq!(display.cursor_x(264, SampleCursor::new(4_800 + 2_400), 4_800), 16 + 116);
        assert_eq!(display.cursor_x(264, SampleCursor::new(-2_400), 4_800), 16 + 116);
    }

    #[test]
    fn test_draw_places_flip_cursors() {
        let (width, height) = (264, 200);
        let mut pixels = vec![0u32; width * height];
        let ring = recorded_ring();
        {
            let mut canvas = Canvas::new(&mut pixels, width, height);
            draw_sync_display(&mut canvas, &ring, 4_800);
        }

        let display = SyncDisplay::default();
        let row = 150;
        let play_x = display.cursor_x(width, SampleCursor::new(2_400), 4_800);
        let write_x = display.cursor_x(width, SampleCursor::new(2_800), 4_800);
        assert_eq!(pixels[row * width + play_x], colors::PLAY);
        assert_eq!(pixels[row * width + write_x], colors::WRITE);

        let expected_x = display.cursor_x(width, SampleCursor::new(2_000), 4_800);
        assert_eq!(pixels[20 * width + expected_x], colors::EXPECTED_FLIP);
        // Not drawn in the lower band
        assert_eq!(pixels[row * width + expected_x], 0);
    }

    #[test]
    fn test_draw_ignores_degenerate_inputs() {
        let mut pixels = vec![0u32; 20 * 20];
        let ring = recorded_ring();
        let mut canvas = Canvas::new(&mut pixels, 20, 20);
        draw_sync_display(&mut canvas, &ring, 4_800);
        draw_sync_display(&mut canvas, &ring, 0);
        assert!(pixels.iter().all(|&p| p == 0));
    }
}
