//! Fixed-rate frame pacing
//!
//! Sleeps the frame thread to the next frame deadline. Late frames are
//! counted as missed; once the loop falls too far behind, the schedule is
//! re-anchored to now instead of trying to catch up (prevents spiral of death).

use std::time::{Duration, Instant};

/// Outcome of waiting for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// The deadline had already passed when the frame asked to wait
    pub missed: bool,
    /// How late the frame started
    pub lag: Duration,
}

/// Paces a loop at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_duration: Duration,
    next_deadline: Option<Instant>,
    /// Lag beyond which the schedule is re-anchored
    max_lag: Duration,
    missed_frames: u64,
}

impl FramePacer {
    pub fn new(hz: u32) -> Self {
        let frame_duration = frame_duration(hz);
        Self {
            frame_duration,
            next_deadline: None,
            max_lag: frame_duration * 4,
            missed_frames: 0,
        }
    }

    /// Change the frame rate, keeping the current deadline.
    pub fn set_rate(&mut self, hz: u32) {
        self.frame_duration = frame_duration(hz);
        self.max_lag = self.frame_duration * 4;
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    /// Compute the sleep needed at `now` and advance the schedule.
    pub fn schedule(&mut self, now: Instant) -> (Option<Duration>, FrameTiming) {
        let deadline = *self.next_deadline.get_or_insert(now);

        if now <= deadline {
            self.next_deadline = Some(deadline + self.frame_duration);
            let sleep = deadline - now;
            let timing = FrameTiming {
                missed: false,
                lag: Duration::ZERO,
            };
            return ((!sleep.is_zero()).then_some(sleep), timing);
        }

        let lag = now - deadline;
        let missed = lag > self.frame_duration / 2;
        if missed {
            self.missed_frames += 1;
        }
        self.next_deadline = if lag > self.max_lag {
            Some(now + self.frame_duration)
        } else {
            Some(deadline + self.frame_duration)
        };
        (None, FrameTiming { missed, lag })
    }

    /// Sleep until the next frame is due.
    pub fn wait(&mut self) -> FrameTiming {
        let (sleep, timing) = self.schedule(Instant::now());
        if let Some(duration) = sleep {
            std::thread::sleep(duration);
        }
        timing
    }
}

fn frame_duration(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / hz.max(1) as f64)
}

/// Drops the frame rate when frames keep arriving late.
#[derive(Debug, Clone)]
pub struct AdaptiveRate {
    /// Consecutive missed frames that trigger a retune
    threshold: u32,
    /// Lowest rate to fall back to
    min_hz: u32,
    streak: u32,
}

impl AdaptiveRate {
    pub fn new(threshold: u32, min_hz: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            min_hz: min_hz.max(1),
            streak: 0,
        }
    }

    /// Feed one frame's timing. Returns the new rate when a retune is due.
    pub fn observe(&mut self, timing: FrameTiming, current_hz: u32) -> Option<u32> {
        if !timing.missed {
            self.streak = 0;
            return None;
        }
        self.streak += 1;
        if self.streak < self.threshold {
            return None;
        }
        self.streak = 0;
        let next = (current_hz / 2).max(self.min_hz);
        (next < current_hz).then_some(next)
    }
}

impl Default for AdaptiveRate {
    fn default() -> Self {
        Self::new(30, 15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_frame_starts_immediately() {
        let mut pacer = FramePacer::new(50);
        let start = Instant::now();
        let (sleep, timing) = pacer.schedule(start);
        assert_eq!(sleep, None);
        assert!(!timing.missed);
    }

    #[test]
    fn test_sleeps_until_next_deadline() {
        let mut pacer = FramePacer::new(50);
        let start = Instant::now();
        pacer.schedule(start);

        let (sleep, timing) = pacer.schedule(start + ms(5));
        assert_eq!(sleep, Some(ms(15)));
        assert!(!timing.missed);
    }

    #[test]
    fn test_late_frame_is_missed() {
        let mut pacer = FramePacer::new(50);
        let start = Instant::now();
        pacer.schedule(start);

        let (sleep, timing) = pacer.schedule(start + ms(35));
        assert_eq!(sleep, None);
        assert!(timing.missed);
        assert_eq!(timing.lag, ms(15));
        assert_eq!(pacer.missed_frames(), 1);

        // Schedule kept its phase: next deadline is 40ms
        let (sleep, _) = pacer.schedule(start + ms(36));
        assert_eq!(sleep, Some(ms(4)));
    }

    #[test]
    fn test_large_lag_reanchors() {
        let mut pacer = FramePacer::new(50);
        let start = Instant::now();
        pacer.schedule(start);

        pacer.schedule(start + ms(500));
        let (sleep, _) = pacer.schedule(start + ms(501));
        assert_eq!(sleep, Some(ms(19)));
    }

    #[test]
    fn test_adaptive_rate_halves_after_streak() {
        let mut adaptive = AdaptiveRate::new(3, 15);
        let late = FrameTiming {
            missed: true,
            lag: ms(10),
        };
        let on_time = FrameTiming {
            missed: false,
            lag: Duration::ZERO,
        };

        assert_eq!(adaptive.observe(late, 60), None);
        assert_eq!(adaptive.observe(late, 60), None);
        assert_eq!(adaptive.observe(on_time, 60), None);
        assert_eq!(adaptive.observe(late, 60), None);
        assert_eq!(adaptive.observe(late, 60), None);
        assert_eq!(adaptive.observe(late, 60), Some(30));
    }

    #[test]
    fn test_adaptive_rate_respects_floor() {
        let mut adaptive = AdaptiveRate::new(1, 15);
        let late = FrameTiming {
            missed: true,
            lag: ms(10),
        };
        assert_eq!(adaptive.observe(late, 20), Some(15));
        assert_eq!(adaptive.observe(late, 15), None);
    }
}
