//! Submitting samples to the sink and recovering from write failures
//!
//! Policy per error:
//! - underrun: recover the sink, then retry the write exactly once
//! - would-block: nothing written this frame, no retry
//! - anything else: try a generic recovery and one retry, otherwise drop
//!
//! The frame loop is never blocked and never sees an error; the outcome
//! only reports how many frames the sink accepted.

use tracing::{debug, warn};

use crate::device::AudioSink;
use crate::error::SinkError;

/// What happened to one frame's write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// Sample frames the sink accepted
    pub frames_written: usize,
    /// A second write attempt was made after recovery
    pub retried: bool,
    /// The first error seen, if any
    pub error: Option<SinkError>,
    /// The samples were discarded for this frame
    pub dropped: bool,
}

impl WriteOutcome {
    fn written(frames_written: usize) -> Self {
        Self {
            frames_written,
            ..Self::default()
        }
    }

    pub fn is_underrun(&self) -> bool {
        matches!(self.error, Some(SinkError::Underrun))
    }
}

/// Write `samples` (interleaved stereo) to `sink` following the recovery policy.
pub fn submit(sink: &mut dyn AudioSink, samples: &[i16]) -> WriteOutcome {
    if samples.is_empty() {
        return WriteOutcome::default();
    }

    let error = match sink.write(samples) {
        Ok(frames) => return WriteOutcome::written(frames),
        Err(e) => e,
    };

    match error {
        SinkError::WouldBlock => {
            debug!("Audio sink busy, skipping write this frame");
            WriteOutcome {
                error: Some(error),
                ..WriteOutcome::default()
            }
        }
        SinkError::Underrun => {
            debug!("Audio underrun, resetting sink");
            recover_and_retry(sink, samples, error)
        }
        SinkError::Unsupported | SinkError::Device(_) => {
            warn!("Audio write failed: {}", error);
            recover_and_retry(sink, samples, error)
        }
    }
}

fn recover_and_retry(sink: &mut dyn AudioSink, samples: &[i16], error: SinkError) -> WriteOutcome {
    if let Err(e) = sink.recover(&error) {
        warn!("Audio recovery after {} failed: {}. Dropping frame.", error.kind(), e);
        return WriteOutcome {
            error: Some(error),
            dropped: true,
            ..WriteOutcome::default()
        };
    }

    match sink.write(samples) {
        Ok(frames) => WriteOutcome {
            frames_written: frames,
            retried: true,
            error: Some(error),
            dropped: false,
        },
        Err(e) => {
            warn!("Audio retry after {} failed: {}. Dropping frame.", error.kind(), e);
            WriteOutcome {
                frames_written: 0,
                retried: true,
                error: Some(error),
                dropped: true,
            }
        }
    }
}
