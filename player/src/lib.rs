//! framefill player - a frame loop host for the audio fill scheduler
//!
//! Drives an [`AudioEngine`](framefill_core::AudioEngine) from a paced frame
//! loop: update, fill audio, present, record the flip.

pub mod frame_loop;
pub mod pacer;
pub mod sync_dump;

pub use frame_loop::{LoopOptions, LoopSummary, PanSweep, run};
pub use pacer::{AdaptiveRate, FramePacer, FrameTiming};
pub use sync_dump::{render_sync_display, save_sync_display};
