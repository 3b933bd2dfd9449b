//! framefill core - per-frame audio buffer fill
//!
//! Keeps a hardware audio ring buffer fed from the visual frame loop without
//! a dedicated audio thread, at the lowest latency the device and the frame
//! timing jitter allow.
//!
//! # Architecture
//!
//! - [`device`] - Device sessions and sinks (cpal, null, or your own [`AudioSink`])
//! - [`cursor`] - Play/write cursor estimates in running-sample space
//! - [`planner`] - How many samples to write this frame (low/high latency regimes)
//! - [`synth`] - Panned tone synthesis into interleaved 16-bit stereo
//! - [`driver`] - Submitting samples and recovering from underruns
//! - [`debug`] - Sync markers, sync display, overlay stats
//! - [`AudioEngine`] - Owns all of the above and runs one fill per frame
//!
//! # Usage
//!
//! ```ignore
//! let config = framefill_core::config::load();
//! let mut engine = AudioEngine::open(
//!     config.sound_output(),
//!     &CpalBackend,
//!     config.audio.buffer_ms,
//!     NoopObserver,
//! );
//!
//! loop {
//!     // update + render ...
//!     engine.fill_frame();
//!     // present ...
//!     engine.frame_presented();
//! }
//! ```

pub mod config;
pub mod cursor;
pub mod debug;
pub mod device;
pub mod driver;
pub mod engine;
pub mod error;
pub mod planner;
pub mod sound_output;
pub mod synth;
#[cfg(test)]
pub mod test_utils;

pub use cursor::{CursorEstimate, SampleCursor};
pub use debug::{DebugObserver, FillObserver, MarkerRecorder, NoopObserver};
#[cfg(feature = "cpal-backend")]
pub use device::{CpalBackend, CpalSink};
pub use device::{AudioSink, DeviceRequest, DeviceSession, NullBackend, NullSink, SinkBackend};
pub use driver::{WriteOutcome, submit};
pub use engine::{AudioEngine, FillStats, FrameReport};
pub use error::{InitError, SinkError};
pub use planner::{FrameFillPlan, LatencyRegime, clamp_fill, plan_frame, plan_target};
pub use sound_output::SoundOutput;
pub use synth::{pan_gains, synthesize_tone};
