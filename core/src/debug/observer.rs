//! Observer seam for fill diagnostics

use super::markers::MarkerRing;
use crate::cursor::SampleCursor;
use crate::planner::FrameFillPlan;

/// Receives the two halves of each frame's diagnostics.
///
/// The engine calls [`before_write`](Self::before_write) with the frame's
/// plan right before submitting samples, and
/// [`frame_presented`](Self::frame_presented) with freshly queried cursors
/// after the caller reports the frame was shown.
pub trait FillObserver {
    fn before_write(&mut self, _plan: &FrameFillPlan) {}

    fn frame_presented(&mut self, _flip_play_cursor: SampleCursor, _flip_write_cursor: SampleCursor) {}

    /// Marker history, for observers that keep one.
    fn markers(&self) -> Option<&MarkerRing> {
        None
    }
}

/// Observer that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FillObserver for NoopObserver {}

/// Observer that keeps the last [`MARKER_COUNT`](super::MARKER_COUNT) frames.
#[derive(Debug, Default, Clone)]
pub struct MarkerRecorder {
    ring: MarkerRing,
}

impl MarkerRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ring(&self) -> &MarkerRing {
        &self.ring
    }
}

impl FillObserver for MarkerRecorder {
    fn before_write(&mut self, plan: &FrameFillPlan) {
        self.ring.record_output(plan);
    }

    fn frame_presented(&mut self, flip_play_cursor: SampleCursor, flip_write_cursor: SampleCursor) {
        self.ring.record_flip(flip_play_cursor, flip_write_cursor);
    }

    fn markers(&self) -> Option<&MarkerRing> {
        Some(&self.ring)
    }
}

/// Either observer, chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum DebugObserver {
    Off(NoopObserver),
    Markers(MarkerRecorder),
}

impl DebugObserver {
    pub fn new(markers: bool) -> Self {
        if markers {
            DebugObserver::Markers(MarkerRecorder::new())
        } else {
            DebugObserver::Off(NoopObserver)
        }
    }
}

impl FillObserver for DebugObserver {
    fn before_write(&mut self, plan: &FrameFillPlan) {
        match self {
            DebugObserver::Off(o) => o.before_write(plan),
            DebugObserver::Markers(o) => o.before_write(plan),
        }
    }

    fn frame_presented(&mut self, flip_play_cursor: SampleCursor, flip_write_cursor: SampleCursor) {
        match self {
            DebugObserver::Off(o) => o.frame_presented(flip_play_cursor, flip_write_cursor),
            DebugObserver::Markers(o) => o.frame_presented(flip_play_cursor, flip_write_cursor),
        }
    }

    fn markers(&self) -> Option<&MarkerRing> {
        match self {
            DebugObserver::Off(o) => o.markers(),
            DebugObserver::Markers(o) => o.markers(),
        }
    }
}
