//! Error types for the audio fill pipeline
//!
//! None of these ever reach the frame loop as a failure: initialization
//! errors degrade the session to silence, sink errors are absorbed by the
//! write driver or replaced by conservative defaults.

use thiserror::Error;

/// Failure to open or configure the output device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("No audio output device available")]
    NoDevice,

    #[error("Device does not support {channels}-channel output at {sample_rate} Hz")]
    UnsupportedFormat { channels: u16, sample_rate: u32 },

    #[error("Failed to query device configs: {0}")]
    DeviceQuery(String),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(String),

    #[error("Failed to play audio stream: {0}")]
    PlayStream(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(&'static str),
}

/// Errors reported by an open sink on query or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The device consumed every queued sample before new ones arrived.
    #[error("Buffer underrun")]
    Underrun,

    /// The device cannot take samples right now; try again next frame.
    #[error("Device busy, try again")]
    WouldBlock,

    /// The sink does not implement this query.
    #[error("Operation not supported by sink")]
    Unsupported,

    /// Any other driver failure.
    #[error("Device error: {0}")]
    Device(String),
}

impl SinkError {
    /// Short label for logs and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            SinkError::Underrun => "underrun",
            SinkError::WouldBlock => "would-block",
            SinkError::Unsupported => "unsupported",
            SinkError::Device(_) => "device",
        }
    }
}
