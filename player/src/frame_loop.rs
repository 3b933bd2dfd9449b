//! The paced frame loop
//!
//! Each frame runs update → audio fill → present → flip record, in that
//! order, so the fill happens where a game would issue it: after update and
//! render, just before the frame is shown.

use std::time::{Duration, Instant};

use framefill_core::{AudioEngine, FillObserver};
use tracing::{debug, info, warn};

use crate::pacer::{AdaptiveRate, FramePacer};

/// Loop settings.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Frames to run (None = run until the process is stopped)
    pub frames: Option<u64>,
    /// Sweep the pan position back and forth
    pub pan_sweep: Option<PanSweep>,
    /// Halve the frame rate on sustained misses
    pub adaptive_frame_rate: bool,
    /// How often to log the fill stats
    pub stats_interval: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            frames: None,
            pan_sweep: None,
            adaptive_frame_rate: true,
            stats_interval: Duration::from_secs(1),
        }
    }
}

/// Triangle-wave pan sweep, the "game update" of the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSweep {
    /// Pan units moved per frame
    pub step: f32,
}

impl PanSweep {
    pub fn new(step: f32) -> Self {
        Self { step: step.abs() }
    }

    /// Move `pan` one step, bouncing off the limits. Returns the new
    /// direction sign.
    pub fn advance(&self, pan: f32, direction: f32) -> (f32, f32) {
        let next = pan + self.step * direction;
        if next >= 100.0 {
            (100.0, -1.0)
        } else if next <= -100.0 {
            (-100.0, 1.0)
        } else {
            (next, direction)
        }
    }
}

/// Totals from a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub missed_frames: u64,
    pub final_hz: u32,
}

/// Run the frame loop until `options.frames` have elapsed.
pub fn run<O: FillObserver>(engine: &mut AudioEngine<O>, options: &LoopOptions) -> LoopSummary {
    let mut hz = engine.sound().game_update_hz();
    let mut pacer = FramePacer::new(hz);
    let mut adaptive = AdaptiveRate::default();
    let mut direction = 1.0;
    let mut frame: u64 = 0;
    let mut last_report = Instant::now();

    if !engine.is_active() {
        warn!("Audio output unavailable, running frame loop silently");
    }

    while options.frames.is_none_or(|limit| frame < limit) {
        let timing = pacer.wait();

        if let Some(sweep) = options.pan_sweep {
            let (pan, dir) = sweep.advance(engine.sound().pan_position, direction);
            direction = dir;
            engine.sound_mut().set_pan(pan);
        }

        if let Some(report) = engine.fill_frame()
            && report.plan.is_skip()
        {
            debug!(frame, regime = report.plan.regime.label(), "No room to write this frame");
        }

        // Presentation point: the frame would be shown here.
        engine.frame_presented();

        if options.adaptive_frame_rate
            && let Some(next_hz) = adaptive.observe(timing, hz)
        {
            warn!(from = hz, to = next_hz, "Frames consistently missed, lowering frame rate");
            hz = next_hz;
            pacer.set_rate(hz);
            engine.sound_mut().set_game_update_hz(hz);
        }

        if last_report.elapsed() >= options.stats_interval {
            last_report = Instant::now();
            log_stats(engine);
        }

        frame += 1;
    }

    LoopSummary {
        frames: frame,
        missed_frames: pacer.missed_frames(),
        final_hz: hz,
    }
}

fn log_stats<O: FillObserver>(engine: &AudioEngine<O>) {
    let line = engine
        .debug_stats()
        .iter()
        .map(|stat| format!("{}={}", stat.name, stat.value))
        .collect::<Vec<_>>()
        .join(" ");
    info!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use framefill_core::{AudioSink, DebugObserver, DeviceRequest, InitError, NullBackend, SinkBackend, SoundOutput};

    struct NoDevice;

    impl SinkBackend for NoDevice {
        fn name(&self) -> &'static str {
            "none"
        }

        fn open(&self, _request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError> {
            Err(InitError::NoDevice)
        }
    }

    #[test]
    fn test_pan_sweep_bounces() {
        let sweep = PanSweep::new(30.0);
        assert_eq!(sweep.advance(0.0, 1.0), (30.0, 1.0));
        assert_eq!(sweep.advance(90.0, 1.0), (100.0, -1.0));
        assert_eq!(sweep.advance(-80.0, -1.0), (-100.0, 1.0));
    }

    #[test]
    fn test_run_counts_frames_with_null_device() {
        let sound = SoundOutput::new(48_000, 200);
        let mut engine = AudioEngine::open(sound, &NullBackend, 100, DebugObserver::new(true));
        let options = LoopOptions {
            frames: Some(5),
            pan_sweep: Some(PanSweep::new(10.0)),
            adaptive_frame_rate: false,
            stats_interval: Duration::from_secs(60),
        };

        let summary = run(&mut engine, &options);

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.final_hz, 200);
        assert_eq!(engine.stats().frames, 5);
        assert_eq!(engine.sound().pan_position, 50.0);
        assert!(engine.observer().markers().is_some_and(|ring| ring.frames_recorded() == 5));
    }

    #[test]
    fn test_run_without_device_still_paces() {
        let sound = SoundOutput::new(48_000, 200);
        let mut engine = AudioEngine::open(sound, &NoDevice, 100, DebugObserver::new(false));
        let options = LoopOptions {
            frames: Some(3),
            adaptive_frame_rate: false,
            ..LoopOptions::default()
        };

        let summary = run(&mut engine, &options);

        assert_eq!(summary.frames, 3);
        assert_eq!(engine.stats().frames, 0);
    }
}
