//! Per-frame cursor markers for audio sync diagnostics
//!
//! Each frame fills one marker in two phases: the pre-write half records what
//! the planner saw and predicted, the post-flip half records where the
//! hardware actually was once the frame hit the screen. The difference
//! between `expected_flip_play_cursor` and `flip_play_cursor` is the
//! prediction error.

use crate::cursor::SampleCursor;
use crate::planner::{FrameFillPlan, LatencyRegime};

/// Number of frames kept in the marker ring
pub const MARKER_COUNT: usize = 30;

/// Cursor snapshot for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugMarker {
    // Captured before the write
    pub output_play_cursor: SampleCursor,
    /// Safety-padded write cursor
    pub output_write_cursor: SampleCursor,
    /// Where this frame's samples start
    pub output_location: SampleCursor,
    pub output_sample_count: usize,
    pub expected_flip_play_cursor: SampleCursor,
    pub regime: Option<LatencyRegime>,

    // Captured after present
    pub flip_play_cursor: SampleCursor,
    pub flip_write_cursor: SampleCursor,
    /// Both halves have been recorded
    pub complete: bool,
}

impl DebugMarker {
    fn begin(plan: &FrameFillPlan) -> Self {
        Self {
            output_play_cursor: plan.play_cursor,
            output_write_cursor: plan.safe_write_cursor,
            output_location: plan.write_cursor,
            output_sample_count: plan.samples_to_write,
            expected_flip_play_cursor: plan.expected_frame_boundary,
            regime: Some(plan.regime),
            ..Self::default()
        }
    }

    /// Predicted minus actual flip play cursor, in sample frames.
    ///
    /// Positive means the hardware was behind the prediction.
    pub fn prediction_error(&self) -> Option<i64> {
        self.complete
            .then(|| self.expected_flip_play_cursor - self.flip_play_cursor)
    }

    /// Prediction error converted to milliseconds.
    pub fn prediction_error_ms(&self, samples_per_second: u32) -> Option<f32> {
        if samples_per_second == 0 {
            return None;
        }
        self.prediction_error()
            .map(|e| e as f32 * 1000.0 / samples_per_second as f32)
    }
}

/// Fixed-size ring of markers, advanced once per presented frame.
#[derive(Debug, Clone)]
pub struct MarkerRing {
    markers: [DebugMarker; MARKER_COUNT],
    /// Slot being filled for the current frame
    index: usize,
    /// Frames completed since creation
    frames: u64,
}

impl Default for MarkerRing {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerRing {
    pub fn new() -> Self {
        Self {
            markers: [DebugMarker::default(); MARKER_COUNT],
            index: 0,
            frames: 0,
        }
    }

    /// Index of the slot for the current frame.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frames_recorded(&self) -> u64 {
        self.frames
    }

    pub fn current(&self) -> &DebugMarker {
        &self.markers[self.index]
    }

    /// Record the pre-write half for the current frame.
    pub fn record_output(&mut self, plan: &FrameFillPlan) {
        self.markers[self.index] = DebugMarker::begin(plan);
    }

    /// Record the post-flip half and move to the next slot.
    pub fn record_flip(&mut self, flip_play_cursor: SampleCursor, flip_write_cursor: SampleCursor) {
        let marker = &mut self.markers[self.index];
        marker.flip_play_cursor = flip_play_cursor;
        marker.flip_write_cursor = flip_write_cursor;
        marker.complete = true;

        self.index = (self.index + 1) % MARKER_COUNT;
        self.frames += 1;
    }

    /// Completed markers, oldest first.
    pub fn completed(&self) -> impl Iterator<Item = &DebugMarker> {
        let (newer, older) = self.markers.split_at(self.index);
        older.iter().chain(newer).filter(|m| m.complete)
    }

    /// The most recent completed marker.
    pub fn latest(&self) -> Option<&DebugMarker> {
        let prev = (self.index + MARKER_COUNT - 1) % MARKER_COUNT;
        let marker = &self.markers[prev];
        marker.complete.then_some(marker)
    }

    /// Mean prediction error over the completed markers, in sample frames.
    pub fn mean_prediction_error(&self) -> Option<f64> {
        let (sum, count) = self
            .completed()
            .filter_map(DebugMarker::prediction_error)
            .fold((0i64, 0u32), |(s, c), e| (s + e, c + 1));
        (count > 0).then(|| sum as f64 / count as f64)
    }
}
