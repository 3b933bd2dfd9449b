//! Device session lifecycle: open, negotiated size, scratch buffer, close

use tracing::{debug, warn};

use super::{AudioSink, DeviceRequest, SinkBackend};
use crate::sound_output::{CHANNELS, SoundOutput};

/// An open (or failed) output device plus its scratch buffer.
///
/// A session that failed to open holds no sink; every operation on it is a
/// silent no-op and the game keeps running without sound.
pub struct DeviceSession {
    sink: Option<Box<dyn AudioSink>>,
    /// Capacity the sink actually granted, in sample frames
    buffer_size: usize,
    /// Interleaved stereo scratch space, sized to `buffer_size`
    scratch: Vec<i16>,
}

impl DeviceSession {
    /// Open a sink through `backend` and size everything from what it grants.
    ///
    /// Sets `sound.is_initialized` to reflect the outcome. If the sink runs at
    /// a different rate than requested, `sound` is retuned to that rate.
    pub fn open(sound: &mut SoundOutput, backend: &dyn SinkBackend, request: DeviceRequest) -> Self {
        let opened = request.validate().and_then(|()| backend.open(&request));
        match opened {
            Ok(sink) => {
                let buffer_size = sink.buffer_size();
                if buffer_size != request.buffer_frames {
                    debug!(
                        "{} granted {} frames (requested {})",
                        backend.name(),
                        buffer_size,
                        request.buffer_frames
                    );
                }
                if sink.sample_rate() != sound.samples_per_second {
                    debug!(
                        "{} runs at {} Hz (requested {} Hz)",
                        backend.name(),
                        sink.sample_rate(),
                        sound.samples_per_second
                    );
                    sound.samples_per_second = sink.sample_rate();
                    let hz = sound.game_update_hz();
                    sound.set_game_update_hz(hz);
                }
                sound.is_initialized = buffer_size > 0;
                debug!(
                    "Audio session open on {}: {} Hz, {} frame ring",
                    backend.name(),
                    sound.samples_per_second,
                    buffer_size
                );
                Self {
                    sink: Some(sink),
                    buffer_size,
                    scratch: vec![0; buffer_size * CHANNELS as usize],
                }
            }
            Err(e) => {
                warn!("Failed to open audio output: {}. Audio disabled.", e);
                sound.is_initialized = false;
                Self::closed()
            }
        }
    }

    /// A session with no device.
    pub fn closed() -> Self {
        Self {
            sink: None,
            buffer_size: 0,
            scratch: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Ring capacity the device actually granted, in sample frames.
    pub fn query_actual_buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Scratch capacity in sample frames.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.len() / CHANNELS as usize
    }

    pub fn sink_mut(&mut self) -> Option<&mut (dyn AudioSink + 'static)> {
        self.sink.as_deref_mut()
    }

    /// Borrow the sink and scratch buffer together.
    pub fn parts_mut(&mut self) -> Option<(&mut (dyn AudioSink + 'static), &mut [i16])> {
        let sink = self.sink.as_deref_mut()?;
        Some((sink, self.scratch.as_mut_slice()))
    }

    /// Stop the device. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
            debug!("Audio session closed");
        }
        self.buffer_size = 0;
        self.scratch = Vec::new();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("open", &self.is_open())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}
