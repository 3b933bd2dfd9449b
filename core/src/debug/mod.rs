//! Audio sync diagnostics
//!
//! Per-frame markers comparing predicted and actual cursor positions, an
//! observer seam so the engine can run with or without them, a sync display
//! renderer, and overlay statistics.
//!
//! Recording is opt-in: the engine is generic over [`FillObserver`] and
//! [`NoopObserver`] compiles down to nothing.

pub mod display;
pub mod markers;
pub mod observer;
pub mod stats;

pub use display::{Canvas, SyncDisplay, draw_sync_display};
pub use markers::{DebugMarker, MARKER_COUNT, MarkerRing};
pub use observer::{DebugObserver, FillObserver, MarkerRecorder, NoopObserver};
pub use stats::{DebugStat, fill_stats};
