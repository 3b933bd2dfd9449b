//! Fill-amount planning
//!
//! Decides how many sample frames to write this frame. Two regimes:
//!
//! - **Low latency**: the padded write cursor is still ahead of the predicted
//!   play position at the next flip, so the play cursor is trusted and we
//!   write exactly up to one frame past the next frame boundary.
//! - **High latency**: the buffer is too deep (or the delay unknown) to
//!   predict the flip precisely, so we write one frame plus the safety
//!   margin past the current write cursor.
//!
//! Sinks without a delay query skip both and fill whatever is available.
//!
//! The low-latency branch predicts from the play cursor while the
//! high-latency branch targets from the write cursor. Both formulas are kept
//! as they are; changing either shifts the underrun/latency trade-off.

use crate::cursor::{CursorEstimate, SampleCursor};

/// Which target formula produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LatencyRegime {
    /// Target is one frame past the predicted next flip
    Low,
    /// Target is one frame plus the safety margin past the write cursor
    High,
    /// No delay query: fill what the sink reports as free
    AvailabilityOnly,
}

impl LatencyRegime {
    pub fn label(self) -> &'static str {
        match self {
            LatencyRegime::Low => "low-latency",
            LatencyRegime::High => "high-latency",
            LatencyRegime::AvailabilityOnly => "availability",
        }
    }
}

/// Unclamped target for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTarget {
    pub regime: LatencyRegime,
    /// Predicted play position when the next frame is presented
    pub expected_frame_boundary: SampleCursor,
    pub target_cursor: SampleCursor,
}

impl FillTarget {
    /// Frames between the write cursor and the target; may be negative.
    pub fn desired_samples(&self, write_cursor: SampleCursor) -> i64 {
        self.target_cursor - write_cursor
    }
}

/// The plan for one frame. Recomputed every frame, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFillPlan {
    pub play_cursor: SampleCursor,
    pub write_cursor: SampleCursor,
    pub safe_write_cursor: SampleCursor,
    pub expected_frame_boundary: SampleCursor,
    pub target_cursor: SampleCursor,
    pub regime: LatencyRegime,
    /// Frames to synthesize and submit, already clamped
    pub samples_to_write: usize,
}

impl FrameFillPlan {
    /// Nothing to write this frame. Not an error.
    pub fn is_skip(&self) -> bool {
        self.samples_to_write == 0
    }
}

/// Pick the regime and target cursor.
///
/// Pure: identical inputs always give identical outputs.
pub fn plan_target(
    play_cursor: SampleCursor,
    write_cursor: SampleCursor,
    safety_sample_count: i64,
    samples_per_frame: i64,
) -> FillTarget {
    let expected_frame_boundary = play_cursor + samples_per_frame;
    let safe_write_cursor = write_cursor + safety_sample_count;

    if safe_write_cursor < expected_frame_boundary {
        FillTarget {
            regime: LatencyRegime::Low,
            expected_frame_boundary,
            target_cursor: expected_frame_boundary + samples_per_frame,
        }
    } else {
        FillTarget {
            regime: LatencyRegime::High,
            expected_frame_boundary,
            target_cursor: write_cursor + samples_per_frame + safety_sample_count,
        }
    }
}

/// Clamp a desired frame count to `[0, min(available, scratch_capacity)]`.
pub fn clamp_fill(desired: i64, available: usize, scratch_capacity: usize) -> usize {
    let limit = available.min(scratch_capacity);
    if desired <= 0 {
        0
    } else {
        (desired as u64).min(limit as u64) as usize
    }
}

/// Full plan for one frame.
///
/// `available` is what the sink reported as free (zero if that query
/// failed). With `has_delay_query == false` the availability-only strategy
/// is used regardless of the cursors.
pub fn plan_frame(
    cursors: &CursorEstimate,
    safety_sample_count: u32,
    samples_per_frame: u32,
    available: usize,
    scratch_capacity: usize,
    has_delay_query: bool,
) -> FrameFillPlan {
    let target = plan_target(
        cursors.play_cursor,
        cursors.write_cursor,
        safety_sample_count as i64,
        samples_per_frame as i64,
    );

    let (regime, target_cursor, samples_to_write) = if has_delay_query {
        let samples = clamp_fill(
            target.desired_samples(cursors.write_cursor),
            available,
            scratch_capacity,
        );
        (target.regime, target.target_cursor, samples)
    } else {
        let samples = available.min(scratch_capacity);
        (
            LatencyRegime::AvailabilityOnly,
            cursors.write_cursor + samples as i64,
            samples,
        )
    };

    FrameFillPlan {
        play_cursor: cursors.play_cursor,
        write_cursor: cursors.write_cursor,
        safe_write_cursor: cursors.safe_write_cursor,
        expected_frame_boundary: target.expected_frame_boundary,
        target_cursor,
        regime,
        samples_to_write,
    }
}
