//! Hardware sink using cpal and a lock-free ring buffer
//!
//! The ring buffer of interleaved `i16` samples plays the role of the
//! hardware buffer: the frame thread fills it, the cpal callback drains it
//! and converts to whatever sample format the device wants.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use tracing::{debug, error, warn};

use super::{AudioSink, DeviceRequest, SinkBackend};
use crate::error::{InitError, SinkError};
use crate::sound_output::CHANNELS;

const CHANNEL_COUNT: usize = CHANNELS as usize;

// ============================================================================
// Stream state
// ============================================================================

/// Flags shared between the frame thread and the cpal callback thread.
#[derive(Debug, Default)]
struct StreamFlags {
    /// Set after the first successful write; running dry before that is startup silence
    primed: AtomicBool,
    /// The callback ran out of queued samples
    underrun: AtomicBool,
    /// The stream reported an error
    faulted: AtomicBool,
    /// Frames between the callback and the moment they reach the speaker
    device_latency_frames: AtomicUsize,
}

impl StreamFlags {
    /// Callback side: `popped` of `requested` samples were available.
    fn on_callback(&self, popped: usize, requested: usize) {
        if popped < requested && self.primed.load(Ordering::Acquire) {
            self.underrun.store(true, Ordering::Release);
        }
    }

    /// Error callback side.
    fn on_stream_error(&self) {
        self.faulted.store(true, Ordering::Release);
    }

    fn on_write(&self, pushed: usize) {
        if pushed > 0 {
            self.primed.store(true, Ordering::Release);
        }
    }

    fn set_latency(&self, frames: usize) {
        self.device_latency_frames.store(frames, Ordering::Relaxed);
    }

    fn latency(&self) -> usize {
        self.device_latency_frames.load(Ordering::Relaxed)
    }

    /// Queries fail only once the stream itself is broken.
    fn check_stream(&self) -> Result<(), SinkError> {
        if self.faulted.load(Ordering::Acquire) {
            return Err(SinkError::Device("stream faulted".to_string()));
        }
        Ok(())
    }

    /// Writes also report an underrun until it is recovered.
    fn check_write(&self) -> Result<(), SinkError> {
        self.check_stream()?;
        if self.underrun.load(Ordering::Acquire) {
            return Err(SinkError::Underrun);
        }
        Ok(())
    }

    /// Acknowledge an underrun. The next write re-primes the stream.
    fn clear_underrun(&self) {
        self.primed.store(false, Ordering::Release);
        self.underrun.store(false, Ordering::Release);
    }
}

// ============================================================================
// Format selection
// ============================================================================

/// One supported output config, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatCandidate {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: SampleFormat,
}

/// Preference order among the formats the callback can convert to.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Best format among configs with `channels` whose rate range covers `sample_rate`.
///
/// Native i16 is preferred so the callback does no conversion.
fn pick_sample_format(
    candidates: impl IntoIterator<Item = FormatCandidate>,
    channels: u16,
    sample_rate: u32,
) -> Option<SampleFormat> {
    candidates
        .into_iter()
        .filter(|c| c.channels == channels && c.min_rate <= sample_rate && sample_rate <= c.max_rate)
        .filter_map(|c| format_rank(c.format).map(|rank| (rank, c.format)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, format)| format)
}

// ============================================================================
// Backend
// ============================================================================

/// Opens [`CpalSink`]s on the default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl SinkBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn open(&self, request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError> {
        Ok(Box::new(CpalSink::open(request)?))
    }
}

/// A running stream and the frame-thread side of its ring.
struct StreamHandle {
    producer: HeapProd<i16>,
    stream: cpal::Stream,
    flags: Arc<StreamFlags>,
}

/// Output sink backed by a cpal stream.
pub struct CpalSink {
    handle: StreamHandle,
    /// Kept so a dead stream can be rebuilt
    request: DeviceRequest,
    /// Ring capacity in sample frames
    buffer_frames: usize,
}

impl CpalSink {
    /// Open the default output device as 16-bit interleaved stereo.
    pub fn open(request: &DeviceRequest) -> Result<Self, InitError> {
        request.validate()?;
        let handle = start_stream(request)?;
        let buffer_frames = handle.producer.capacity().get() / CHANNEL_COUNT;

        Ok(Self {
            handle,
            request: *request,
            buffer_frames,
        })
    }

    /// Replace the stream with a fresh one on the current default device.
    ///
    /// Samples still queued in the old ring are discarded.
    fn rebuild(&mut self) -> Result<(), SinkError> {
        let handle = start_stream(&self.request).map_err(|e| SinkError::Device(e.to_string()))?;
        if let Err(e) = self.handle.stream.pause() {
            debug!("Failed to pause dead audio stream: {}", e);
        }
        self.handle = handle;
        Ok(())
    }
}

/// Open the default device and start draining a new ring into it.
fn start_stream(request: &DeviceRequest) -> Result<StreamHandle, InitError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(InitError::NoDevice)?;

    let candidates = device
        .supported_output_configs()
        .map_err(|e| InitError::DeviceQuery(e.to_string()))?
        .map(|range| FormatCandidate {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            format: range.sample_format(),
        });
    let sample_format = pick_sample_format(candidates, request.channels, request.sample_rate).ok_or(
        InitError::UnsupportedFormat {
            channels: request.channels,
            sample_rate: request.sample_rate,
        },
    )?;

    let config = StreamConfig {
        channels: request.channels,
        sample_rate: cpal::SampleRate(request.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let ring = HeapRb::<i16>::new(request.buffer_frames * CHANNEL_COUNT);
    let (producer, consumer) = ring.split();
    let flags = Arc::new(StreamFlags::default());
    let sample_rate = request.sample_rate;

    let stream = match sample_format {
        SampleFormat::I16 => build_stream(&device, &config, consumer, Arc::clone(&flags), sample_rate, |s: i16| s, 0i16)?,
        SampleFormat::F32 => build_stream(
            &device,
            &config,
            consumer,
            Arc::clone(&flags),
            sample_rate,
            |s: i16| s as f32 / 32768.0,
            0.0f32,
        )?,
        SampleFormat::U16 => build_stream(
            &device,
            &config,
            consumer,
            Arc::clone(&flags),
            sample_rate,
            // 0x8000 is silence for u16 audio
            |s: i16| (s as i32 + 32768) as u16,
            32768u16,
        )?,
        other => {
            return Err(InitError::BuildStream(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    };

    stream
        .play()
        .map_err(|e| InitError::PlayStream(e.to_string()))?;

    debug!(
        "cpal stream started: {} Hz, {:?}, {} frame ring",
        sample_rate,
        sample_format,
        producer.capacity().get() / CHANNEL_COUNT
    );

    Ok(StreamHandle {
        producer,
        stream,
        flags,
    })
}

/// Build an output stream that drains `consumer` into device samples of type `T`.
fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<i16>,
    flags: Arc<StreamFlags>,
    sample_rate: u32,
    convert: F,
    silence: T,
) -> Result<cpal::Stream, InitError>
where
    T: cpal::SizedSample + Send + 'static,
    F: Fn(i16) -> T + Send + 'static,
{
    let error_flags = Arc::clone(&flags);
    // Pre-allocate buffer for batch reads
    let mut temp_buffer: Vec<i16> = vec![0; 4096];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                if temp_buffer.len() < data.len() {
                    temp_buffer.resize(data.len(), 0);
                }
                let popped = consumer.pop_slice(&mut temp_buffer[..data.len()]);
                for (out, &s) in data.iter_mut().zip(&temp_buffer[..popped]) {
                    *out = convert(s);
                }
                data[popped..].fill(silence);
                flags.on_callback(popped, data.len());

                let timestamp = info.timestamp();
                if let Some(latency) = timestamp.playback.duration_since(&timestamp.callback) {
                    flags.set_latency((latency.as_secs_f64() * sample_rate as f64) as usize);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flags.on_stream_error();
            },
            None,
        )
        .map_err(|e| InitError::BuildStream(e.to_string()))
}

impl AudioSink for CpalSink {
    fn buffer_size(&self) -> usize {
        self.buffer_frames
    }

    fn sample_rate(&self) -> u32 {
        self.request.sample_rate
    }

    fn pending_delay(&mut self) -> Result<usize, SinkError> {
        self.handle.flags.check_stream()?;
        let queued = self.handle.producer.occupied_len() / CHANNEL_COUNT;
        Ok(queued + self.handle.flags.latency())
    }

    fn available(&mut self) -> Result<usize, SinkError> {
        self.handle.flags.check_stream()?;
        Ok(self.handle.producer.vacant_len() / CHANNEL_COUNT)
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError> {
        self.handle.flags.check_write()?;

        let room = self.handle.producer.vacant_len() / CHANNEL_COUNT;
        if room == 0 {
            return Err(SinkError::WouldBlock);
        }

        // Whole frames only so the interleaving never slips
        let frames = (samples.len() / CHANNEL_COUNT).min(room);
        let pushed = self.handle.producer.push_slice(&samples[..frames * CHANNEL_COUNT]);
        self.handle.flags.on_write(pushed);
        Ok(pushed / CHANNEL_COUNT)
    }

    fn recover(&mut self, error: &SinkError) -> Result<(), SinkError> {
        match error {
            SinkError::Underrun => {
                self.handle.flags.clear_underrun();
                Ok(())
            }
            SinkError::WouldBlock | SinkError::Unsupported => Ok(()),
            SinkError::Device(_) => {
                warn!("Rebuilding audio stream after device error");
                self.rebuild()
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.handle.stream.pause() {
            debug!("Failed to pause audio stream on close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(channels: u16, min_rate: u32, max_rate: u32, format: SampleFormat) -> FormatCandidate {
        FormatCandidate {
            channels,
            min_rate,
            max_rate,
            format,
        }
    }

    #[test]
    fn test_fresh_flags_accept_writes() {
        let flags = StreamFlags::default();
        assert_eq!(flags.check_stream(), Ok(()));
        assert_eq!(flags.check_write(), Ok(()));
    }

    #[test]
    fn test_running_dry_before_priming_is_not_underrun() {
        let flags = StreamFlags::default();
        flags.on_callback(0, 512);
        assert_eq!(flags.check_write(), Ok(()));
    }

    #[test]
    fn test_running_dry_after_priming_is_underrun() {
        let flags = StreamFlags::default();
        flags.on_write(0);
        flags.on_callback(0, 512);
        assert_eq!(flags.check_write(), Ok(()));

        flags.on_write(64);
        flags.on_callback(512, 512);
        assert_eq!(flags.check_write(), Ok(()));

        flags.on_callback(100, 512);
        assert_eq!(flags.check_write(), Err(SinkError::Underrun));
        // Queries stay usable during an underrun
        assert_eq!(flags.check_stream(), Ok(()));
    }

    #[test]
    fn test_clearing_underrun_requires_repriming() {
        let flags = StreamFlags::default();
        flags.on_write(64);
        flags.on_callback(0, 512);

        flags.clear_underrun();
        assert_eq!(flags.check_write(), Ok(()));

        // Startup silence again until the next write lands
        flags.on_callback(0, 512);
        assert_eq!(flags.check_write(), Ok(()));
        flags.on_write(64);
        flags.on_callback(0, 512);
        assert_eq!(flags.check_write(), Err(SinkError::Underrun));
    }

    #[test]
    fn test_stream_error_fails_queries_and_writes() {
        let flags = StreamFlags::default();
        flags.on_write(64);
        flags.on_callback(0, 512);
        flags.on_stream_error();

        assert!(matches!(flags.check_stream(), Err(SinkError::Device(_))));
        // Fault wins over a pending underrun
        assert!(matches!(flags.check_write(), Err(SinkError::Device(_))));
    }

    #[test]
    fn test_latency_is_stored() {
        let flags = StreamFlags::default();
        assert_eq!(flags.latency(), 0);
        flags.set_latency(480);
        assert_eq!(flags.latency(), 480);
    }

    #[test]
    fn test_format_preference_order() {
        let all = [
            candidate(2, 8_000, 96_000, SampleFormat::U16),
            candidate(2, 8_000, 96_000, SampleFormat::F32),
            candidate(2, 8_000, 96_000, SampleFormat::I16),
        ];
        assert_eq!(pick_sample_format(all, 2, 48_000), Some(SampleFormat::I16));
        assert_eq!(pick_sample_format(all[..2].iter().copied(), 2, 48_000), Some(SampleFormat::F32));
        assert_eq!(pick_sample_format(all[..1].iter().copied(), 2, 48_000), Some(SampleFormat::U16));
    }

    #[test]
    fn test_format_requires_channels_and_rate() {
        let configs = [
            candidate(1, 8_000, 96_000, SampleFormat::I16),
            candidate(2, 44_100, 44_100, SampleFormat::I16),
            candidate(2, 8_000, 96_000, SampleFormat::F32),
        ];
        assert_eq!(pick_sample_format(configs, 2, 48_000), Some(SampleFormat::F32));
        assert_eq!(pick_sample_format(configs, 2, 44_100), Some(SampleFormat::I16));
        assert_eq!(pick_sample_format(configs, 2, 192_000), None);
        assert_eq!(pick_sample_format(configs, 6, 48_000), None);
    }

    #[test]
    fn test_unconvertible_formats_are_skipped() {
        let configs = [
            candidate(2, 8_000, 96_000, SampleFormat::F64),
            candidate(2, 8_000, 96_000, SampleFormat::I32),
        ];
        assert_eq!(pick_sample_format(configs, 2, 48_000), None);
    }
}
