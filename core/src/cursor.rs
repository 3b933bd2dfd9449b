//! Virtual play/write cursors in running-sample space
//!
//! All cursors live in the coordinate space of
//! [`SoundOutput::running_sample_index`](crate::SoundOutput): a monotonic
//! count of sample frames. They only wrap when mapped onto the physical ring
//! buffer for display, and that mapping goes through [`SampleCursor`].

use std::ops::{Add, Sub};

use tracing::trace;

use crate::device::AudioSink;
use crate::sound_output::SoundOutput;

/// A position in running-sample space.
///
/// Signed so that estimates computed by subtraction (e.g. a play cursor
/// before any samples were queued) stay representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleCursor(i64);

impl SampleCursor {
    pub const ZERO: SampleCursor = SampleCursor(0);

    pub const fn new(sample: i64) -> Self {
        Self(sample)
    }

    pub fn from_index(index: u64) -> Self {
        Self(i64::try_from(index).unwrap_or(i64::MAX))
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Offset within a ring of `capacity` sample frames.
    ///
    /// Always in `0..capacity`, including for negative cursors.
    pub fn ring_offset(self, capacity: usize) -> usize {
        if capacity == 0 {
            return 0;
        }
        self.0.rem_euclid(capacity as i64) as usize
    }

    /// Ring offset normalized to [0, 1).
    pub fn ring_fraction(self, capacity: usize) -> f32 {
        if capacity == 0 {
            return 0.0;
        }
        self.ring_offset(capacity) as f32 / capacity as f32
    }
}

impl Add<i64> for SampleCursor {
    type Output = SampleCursor;

    fn add(self, rhs: i64) -> SampleCursor {
        SampleCursor(self.0.saturating_add(rhs))
    }
}

impl Sub<i64> for SampleCursor {
    type Output = SampleCursor;

    fn sub(self, rhs: i64) -> SampleCursor {
        SampleCursor(self.0.saturating_sub(rhs))
    }
}

/// Distance in sample frames between two cursors.
impl Sub<SampleCursor> for SampleCursor {
    type Output = i64;

    fn sub(self, rhs: SampleCursor) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

/// Cursor estimate for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorEstimate {
    /// Where the hardware is physically playing now
    pub play_cursor: SampleCursor,
    /// Where the next write will land
    pub write_cursor: SampleCursor,
    /// Write cursor padded by the safety margin
    pub safe_write_cursor: SampleCursor,
    /// Whether the pending delay came from a successful hardware query
    pub delay_known: bool,
}

impl CursorEstimate {
    /// Build cursors from a pending delay (queued but unplayed sample frames).
    ///
    /// A missing delay is treated as an empty buffer.
    pub fn from_delay(sound: &SoundOutput, pending_delay: Option<usize>) -> Self {
        let write_cursor = SampleCursor::from_index(sound.running_sample_index);
        let delay = pending_delay.unwrap_or(0) as i64;
        Self {
            play_cursor: write_cursor - delay,
            write_cursor,
            safe_write_cursor: write_cursor + sound.safety_sample_count as i64,
            delay_known: pending_delay.is_some(),
        }
    }

    /// Query the sink and build cursors, substituting zero delay on failure.
    pub fn query(sink: &mut dyn AudioSink, sound: &SoundOutput) -> Self {
        let delay = if sink.has_delay_query() {
            match sink.pending_delay() {
                Ok(delay) => Some(delay),
                Err(e) => {
                    trace!("Delay query failed ({}), assuming empty buffer", e);
                    None
                }
            }
        } else {
            None
        };
        Self::from_delay(sound, delay)
    }
}
