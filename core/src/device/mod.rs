//! Output device sessions
//!
//! A sink is the hardware ring buffer seen from the frame thread: it can
//! report how much is queued, how much room is left, and accept interleaved
//! 16-bit stereo samples. Backends open sinks; [`DeviceSession`] owns one for
//! the lifetime of the audio session.
//!
//! Sample counts at this interface are always sample *frames* (one left and
//! one right sample), never individual `i16` values.

#[cfg(feature = "cpal-backend")]
mod cpal_sink;
mod null_sink;
mod session;

#[cfg(feature = "cpal-backend")]
pub use cpal_sink::{CpalBackend, CpalSink};
pub use null_sink::{NullBackend, NullSink};
pub use session::DeviceSession;

use crate::error::{InitError, SinkError};
use crate::sound_output::{CHANNELS, SoundOutput};

/// Format and size requested when opening a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count (always stereo)
    pub channels: u16,
    /// Requested ring capacity in sample frames; the sink may grant a different size
    pub buffer_frames: usize,
}

impl DeviceRequest {
    /// Request a ring of `buffer_ms` milliseconds at the output's sample rate.
    pub fn for_output(sound: &SoundOutput, buffer_ms: u32) -> Self {
        let buffer_frames = (sound.samples_per_second as u64 * buffer_ms as u64 / 1000) as usize;
        Self {
            sample_rate: sound.samples_per_second,
            channels: CHANNELS,
            buffer_frames,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InitError> {
        if self.sample_rate == 0 {
            return Err(InitError::InvalidRequest("sample rate must be non-zero"));
        }
        if self.channels != CHANNELS {
            return Err(InitError::InvalidRequest("only stereo output is supported"));
        }
        if self.buffer_frames == 0 {
            return Err(InitError::InvalidRequest("buffer size must be non-zero"));
        }
        Ok(())
    }
}

/// An open hardware sink.
pub trait AudioSink {
    /// Negotiated ring capacity in sample frames.
    fn buffer_size(&self) -> usize;

    /// Sample rate the sink actually runs at.
    fn sample_rate(&self) -> u32;

    /// Whether [`pending_delay`](Self::pending_delay) is implemented.
    ///
    /// Sinks without it get the availability-only fill strategy.
    fn has_delay_query(&self) -> bool {
        true
    }

    /// Sample frames submitted but not yet physically played.
    fn pending_delay(&mut self) -> Result<usize, SinkError> {
        Err(SinkError::Unsupported)
    }

    /// Sample frames that can be written right now without blocking.
    fn available(&mut self) -> Result<usize, SinkError>;

    /// Submit interleaved stereo samples. Returns sample frames accepted.
    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError>;

    /// Try to bring the sink back to a writable state after `error`.
    fn recover(&mut self, error: &SinkError) -> Result<(), SinkError>;

    /// Stop output and release the device.
    fn close(&mut self) {}
}

/// Something that can open a sink.
pub trait SinkBackend {
    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;

    fn open(&self, request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError>;
}
