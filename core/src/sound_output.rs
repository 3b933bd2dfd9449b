//! Sound output descriptor shared between the frame loop and the fill engine

use std::f32::consts::TAU;

/// Bytes per stereo sample frame (two 16-bit channels)
pub const BYTES_PER_SAMPLE: u32 = 4;

/// Number of interleaved channels written to the sink
pub const CHANNELS: u16 = 2;

/// Pan range is -100 (hard left) to 100 (hard right)
pub const PAN_LIMIT: f32 = 100.0;

/// Audio output state for one session.
///
/// Input handlers mutate the tone fields between frames; the engine reads them
/// on the next fill. `running_sample_index` is only advanced by the engine and
/// only by sample frames the sink actually accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundOutput {
    /// Output sample rate in Hz
    pub samples_per_second: u32,
    /// Bytes per stereo sample frame
    pub bytes_per_sample: u32,
    /// Sample frames accepted by the sink since the session started
    pub running_sample_index: u64,
    /// Tone frequency in Hz
    pub tone_hz: f32,
    /// Peak amplitude in 16-bit sample units
    pub tone_volume: f32,
    /// Stereo position, -100..=100
    pub pan_position: f32,
    /// Phase accumulator in radians, kept in [0, 2π)
    pub t_sine: f32,
    /// Jitter margin added to the write cursor, in sample frames
    pub safety_sample_count: u32,
    /// Visual frame rate driving the fill loop
    game_update_hz: u32,
    /// False when the device failed to open; the engine then does nothing
    pub is_initialized: bool,
}

impl SoundOutput {
    /// Create an output descriptor for the given rate and frame rate.
    pub fn new(samples_per_second: u32, game_update_hz: u32) -> Self {
        let game_update_hz = game_update_hz.max(1);
        Self {
            samples_per_second,
            bytes_per_sample: BYTES_PER_SAMPLE,
            running_sample_index: 0,
            tone_hz: 256.0,
            tone_volume: 3000.0,
            pan_position: 0.0,
            t_sine: 0.0,
            safety_sample_count: safety_samples(samples_per_second, game_update_hz),
            game_update_hz,
            is_initialized: false,
        }
    }

    /// Current visual frame rate.
    pub fn game_update_hz(&self) -> u32 {
        self.game_update_hz
    }

    /// Retune the frame rate and recompute the safety margin.
    pub fn set_game_update_hz(&mut self, hz: u32) {
        self.game_update_hz = hz.max(1);
        self.safety_sample_count = safety_samples(self.samples_per_second, self.game_update_hz);
    }

    /// Sample frames produced per visual frame.
    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_second / self.game_update_hz
    }

    /// Phase increment per sample frame, in radians.
    pub fn phase_step(&self) -> f32 {
        if self.samples_per_second == 0 {
            return 0.0;
        }
        TAU * self.tone_hz / self.samples_per_second as f32
    }

    /// Shift the tone frequency, keeping it audible and below Nyquist.
    pub fn nudge_pitch(&mut self, delta_hz: f32) {
        let nyquist = self.samples_per_second as f32 / 2.0;
        self.tone_hz = (self.tone_hz + delta_hz).clamp(20.0, nyquist.max(20.0));
    }

    /// Shift the tone amplitude within the 16-bit range.
    pub fn nudge_volume(&mut self, delta: f32) {
        self.tone_volume = (self.tone_volume + delta).clamp(0.0, i16::MAX as f32);
    }

    /// Set the stereo position, clamped to -100..=100.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan_position = pan.clamp(-PAN_LIMIT, PAN_LIMIT);
    }

    /// Convert a sample frame count into milliseconds at this rate.
    pub fn samples_to_ms(&self, samples: i64) -> f32 {
        if self.samples_per_second == 0 {
            return 0.0;
        }
        samples as f32 * 1000.0 / self.samples_per_second as f32
    }
}

fn safety_samples(samples_per_second: u32, game_update_hz: u32) -> u32 {
    (samples_per_second / game_update_hz) / 3
}
