//! Virtual sink drained by the wall clock
//!
//! Behaves like a device ring buffer without producing sound, so the frame
//! loop can run headless (CI, machines without audio hardware) while the
//! planner still sees realistic delay and availability numbers.

use std::time::Instant;

use super::{AudioSink, DeviceRequest, SinkBackend};
use crate::error::{InitError, SinkError};
use crate::sound_output::CHANNELS;

/// Opens [`NullSink`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl SinkBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn open(&self, request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError> {
        request.validate()?;
        Ok(Box::new(NullSink::new(request.sample_rate, request.buffer_frames)))
    }
}

/// A silent sink whose play position advances in real time.
#[derive(Debug)]
pub struct NullSink {
    sample_rate: u32,
    buffer_frames: usize,
    /// Frames ever submitted
    submitted: u64,
    /// Frames the virtual device has played
    played: u64,
    /// Playback start time and `played` at that moment; `None` while stopped
    anchor: Option<(Instant, u64)>,
    underrun: bool,
}

impl NullSink {
    pub fn new(sample_rate: u32, buffer_frames: usize) -> Self {
        Self {
            sample_rate,
            buffer_frames,
            submitted: 0,
            played: 0,
            anchor: None,
            underrun: false,
        }
    }

    fn drain(&mut self) {
        let Some((start, base)) = self.anchor else {
            return;
        };
        let elapsed = (start.elapsed().as_secs_f64() * self.sample_rate as f64) as u64;
        let target = base + elapsed;
        if target >= self.submitted {
            // Ran dry: the device stops until the next write restarts it
            self.played = self.submitted;
            self.anchor = None;
            self.underrun = true;
        } else {
            self.played = target;
        }
    }

    fn queued(&self) -> usize {
        (self.submitted - self.played) as usize
    }
}

impl AudioSink for NullSink {
    fn buffer_size(&self) -> usize {
        self.buffer_frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn pending_delay(&mut self) -> Result<usize, SinkError> {
        self.drain();
        Ok(self.queued())
    }

    fn available(&mut self) -> Result<usize, SinkError> {
        self.drain();
        Ok(self.buffer_frames.saturating_sub(self.queued()))
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError> {
        self.drain();
        if self.underrun {
            return Err(SinkError::Underrun);
        }
        let room = self.buffer_frames.saturating_sub(self.queued());
        if room == 0 {
            return Err(SinkError::WouldBlock);
        }
        let frames = (samples.len() / CHANNELS as usize).min(room);
        self.submitted += frames as u64;
        if self.anchor.is_none() && frames > 0 {
            self.anchor = Some((Instant::now(), self.played));
        }
        Ok(frames)
    }

    fn recover(&mut self, _error: &SinkError) -> Result<(), SinkError> {
        self.underrun = false;
        Ok(())
    }

    fn close(&mut self) {
        self.anchor = None;
    }
}
