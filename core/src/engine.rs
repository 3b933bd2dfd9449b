//! Per-frame audio fill engine
//!
//! [`AudioEngine`] owns everything the fill loop touches: the sound output
//! descriptor, the device session with its scratch buffer, and the debug
//! observer. The frame loop calls [`AudioEngine::fill_frame`] once per
//! visual frame and [`AudioEngine::frame_presented`] after presenting.
//!
//! Per frame: query free space and cursors → plan → synthesize → submit → advance the
//! running sample index by what the sink accepted.

use tracing::{info, trace};

use crate::cursor::CursorEstimate;
use crate::debug::{DebugStat, FillObserver, NoopObserver, fill_stats};
use crate::device::{AudioSink, DeviceRequest, DeviceSession, SinkBackend};
use crate::driver::{WriteOutcome, submit};
use crate::error::SinkError;
use crate::planner::{FrameFillPlan, LatencyRegime, plan_frame};
use crate::sound_output::{CHANNELS, SoundOutput};
use crate::synth::synthesize_tone;


/// Result of one [`AudioEngine::fill_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub plan: FrameFillPlan,
    pub outcome: WriteOutcome,
}

/// Running counters for the fill loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillStats {
    /// Frames planned
    pub frames: u64,
    /// Frames with nothing to write
    pub frames_skipped: u64,
    /// Sample frames accepted by the sink
    pub samples_written: u64,
    pub underruns: u64,
    pub would_block: u64,
    pub dropped_writes: u64,
    pub low_latency_frames: u64,
    pub high_latency_frames: u64,
    pub availability_frames: u64,
    pub last_regime: Option<LatencyRegime>,
    /// Distance from the play cursor to the write cursor after the last write
    pub last_latency_samples: i64,
}

impl FillStats {
    /// Fold one frame into the counters. Returns true if the regime changed.
    fn record(&mut self, plan: &FrameFillPlan, outcome: &WriteOutcome) -> bool {
        self.frames += 1;
        if plan.is_skip() {
            self.frames_skipped += 1;
        }
        self.samples_written += outcome.frames_written as u64;

        match outcome.error {
            Some(SinkError::Underrun) => self.underruns += 1,
            Some(SinkError::WouldBlock) => self.would_block += 1,
            _ => {}
        }
        if outcome.dropped {
            self.dropped_writes += 1;
        }

        match plan.regime {
            LatencyRegime::Low => self.low_latency_frames += 1,
            LatencyRegime::High => self.high_latency_frames += 1,
            LatencyRegime::AvailabilityOnly => self.availability_frames += 1,
        }

        self.last_latency_samples =
            (plan.write_cursor + outcome.frames_written as i64) - plan.play_cursor;

        let changed = self.last_regime != Some(plan.regime);
        self.last_regime = Some(plan.regime);
        changed
    }
}

/// Owns the audio session and runs the per-frame fill.
pub struct AudioEngine<O: FillObserver = NoopObserver> {
    sound: SoundOutput,
    session: DeviceSession,
    observer: O,
    stats: FillStats,
}

impl<O: FillObserver> AudioEngine<O> {
    /// Assemble an engine from an already opened session.
    pub fn new(sound: SoundOutput, session: DeviceSession, observer: O) -> Self {
        Self {
            sound,
            session,
            observer,
            stats: FillStats::default(),
        }
    }

    /// Open a device through `backend` with a ring of about `buffer_ms`.
    ///
    /// Never fails: if the device cannot be opened the engine runs silent.
    pub fn open(mut sound: SoundOutput, backend: &dyn SinkBackend, buffer_ms: u32, observer: O) -> Self {
        let request = DeviceRequest::for_output(&sound, buffer_ms);
        let session = DeviceSession::open(&mut sound, backend, request);
        Self::new(sound, session, observer)
    }

    pub fn sound(&self) -> &SoundOutput {
        &self.sound
    }

    /// Mutable access for input handlers (tone, pan, frame rate).
    pub fn sound_mut(&mut self) -> &mut SoundOutput {
        &mut self.sound
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn stats(&self) -> &FillStats {
        &self.stats
    }

    /// True when a device is open and producing sound.
    pub fn is_active(&self) -> bool {
        self.sound.is_initialized && self.session.is_open()
    }

    /// Plan, synthesize and submit this frame's samples.
    ///
    /// Returns `None` when audio is disabled. Never blocks on the device and
    /// never fails; problems show up in the returned [`WriteOutcome`].
    pub fn fill_frame(&mut self) -> Option<FrameReport> {
        if !self.sound.is_initialized {
            return None;
        }
        let (sink, scratch) = self.session.parts_mut()?;

        let available = query_available(sink);
        let cursors = CursorEstimate::query(sink, &self.sound);

        let plan = plan_frame(
            &cursors,
            self.sound.safety_sample_count,
            self.sound.samples_per_frame(),
            available,
            scratch.len() / CHANNELS as usize,
            sink.has_delay_query(),
        );

        self.observer.before_write(&plan);

        let outcome = if plan.is_skip() {
            WriteOutcome::default()
        } else {
            let len = synthesize_tone(&mut self.sound, plan.samples_to_write, scratch);
            submit(sink, &scratch[..len])
        };

        self.sound.running_sample_index += outcome.frames_written as u64;

        if self.stats.record(&plan, &outcome) {
            info!(
                "Audio fill regime: {} (play={}, write={}, safety={})",
                plan.regime.label(),
                plan.play_cursor.get(),
                plan.write_cursor.get(),
                self.sound.safety_sample_count
            );
        }

        Some(FrameReport { plan, outcome })
    }

    /// Record where the hardware actually is now that the frame is on screen.
    pub fn frame_presented(&mut self) {
        if !self.sound.is_initialized {
            return;
        }
        let Some(sink) = self.session.sink_mut() else {
            return;
        };
        let cursors = CursorEstimate::query(sink, &self.sound);
        self.observer
            .frame_presented(cursors.play_cursor, cursors.write_cursor);
    }

    /// Overlay rows for the current state.
    pub fn debug_stats(&self) -> Vec<DebugStat> {
        fill_stats(&self.stats, &self.sound, self.observer.markers())
    }

    /// Close the device. Later calls become no-ops.
    pub fn shutdown(&mut self) {
        self.session.close();
        self.sound.is_initialized = false;
    }
}

/// Free space in the sink, in sample frames.
///
/// A device or underrun error gets one recovery attempt per frame, so a
/// faulted sink heals without waiting for a write. Anything still failing
/// counts as no free space and the frame is skipped.
fn query_available(sink: &mut dyn AudioSink) -> usize {
    let error = match sink.available() {
        Ok(frames) => return frames,
        Err(e @ (SinkError::Device(_) | SinkError::Underrun)) => e,
        Err(e) => {
            trace!("Availability query failed ({}), assuming no free space", e);
            return 0;
        }
    };

    if let Err(e) = sink.recover(&error) {
        trace!("Audio recovery after {} failed: {}", error.kind(), e);
        return 0;
    }
    info!("Audio output recovered after {} error", error.kind());

    sink.available().unwrap_or_else(|e| {
        trace!("Availability query failed after recovery ({}), assuming no free space", e);
        0
    })
}
