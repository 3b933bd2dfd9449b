//! Shared test utilities: a scripted in-memory sink and backends

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::device::{AudioSink, DeviceRequest, SinkBackend};
use crate::error::{InitError, SinkError};

// ============================================================================
// Scripted Sink
// ============================================================================

#[derive(Debug)]
struct SinkScript {
    sample_rate: u32,
    buffer_frames: usize,
    has_delay_query: bool,
    /// Frames queued and not yet "played"
    queued: usize,
    /// Extra frames of device latency added to the delay
    latency: usize,
    delay_error: Option<SinkError>,
    available_error: Option<SinkError>,
    write_errors: VecDeque<SinkError>,
    /// Every query and write fails with this until a successful recover
    fault: Option<SinkError>,
    fail_recovery: bool,
    write_calls: usize,
    recover_calls: usize,
    frames_accepted: u64,
    closed: bool,
}

/// In-memory sink with scriptable errors.
///
/// Clones share state, so a test can keep a clone as a probe after the
/// original is boxed into a session.
#[derive(Debug, Clone)]
pub struct ScriptedSink(Rc<RefCell<SinkScript>>);

impl ScriptedSink {
    pub fn new(sample_rate: u32, buffer_frames: usize) -> Self {
        Self(Rc::new(RefCell::new(SinkScript {
            sample_rate,
            buffer_frames,
            has_delay_query: true,
            queued: 0,
            latency: 0,
            delay_error: None,
            available_error: None,
            write_errors: VecDeque::new(),
            fault: None,
            fail_recovery: false,
            write_calls: 0,
            recover_calls: 0,
            frames_accepted: 0,
            closed: false,
        })))
    }

    /// Drain `frames` as if the device played them.
    pub fn play(&self, frames: usize) {
        let mut s = self.0.borrow_mut();
        s.queued = s.queued.saturating_sub(frames);
    }

    pub fn set_queued(&self, frames: usize) {
        self.0.borrow_mut().queued = frames;
    }

    pub fn set_latency(&self, frames: usize) {
        self.0.borrow_mut().latency = frames;
    }

    pub fn set_delay_query(&self, supported: bool) {
        self.0.borrow_mut().has_delay_query = supported;
    }

    pub fn set_delay_error(&self, error: Option<SinkError>) {
        self.0.borrow_mut().delay_error = error;
    }

    pub fn set_available_error(&self, error: Option<SinkError>) {
        self.0.borrow_mut().available_error = error;
    }

    /// Queue an error for the next write call.
    pub fn push_write_error(&self, error: SinkError) {
        self.0.borrow_mut().write_errors.push_back(error);
    }

    /// Fail every query and write with `error` until the sink is recovered.
    pub fn fault_until_recovered(&self, error: SinkError) {
        self.0.borrow_mut().fault = Some(error);
    }

    pub fn is_faulted(&self) -> bool {
        self.0.borrow().fault.is_some()
    }

    pub fn fail_recovery(&self, fail: bool) {
        self.0.borrow_mut().fail_recovery = fail;
    }

    pub fn queued(&self) -> usize {
        self.0.borrow().queued
    }

    pub fn write_calls(&self) -> usize {
        self.0.borrow().write_calls
    }

    pub fn recover_calls(&self) -> usize {
        self.0.borrow().recover_calls
    }

    pub fn frames_accepted(&self) -> u64 {
        self.0.borrow().frames_accepted
    }

    pub fn is_closed(&self) -> bool {
        self.0.borrow().closed
    }
}

impl AudioSink for ScriptedSink {
    fn buffer_size(&self) -> usize {
        self.0.borrow().buffer_frames
    }

    fn sample_rate(&self) -> u32 {
        self.0.borrow().sample_rate
    }

    fn has_delay_query(&self) -> bool {
        self.0.borrow().has_delay_query
    }

    fn pending_delay(&mut self) -> Result<usize, SinkError> {
        let s = self.0.borrow();
        if !s.has_delay_query {
            return Err(SinkError::Unsupported);
        }
        if let Some(e) = &s.fault {
            return Err(e.clone());
        }
        match &s.delay_error {
            Some(e) => Err(e.clone()),
            None => Ok(s.queued + s.latency),
        }
    }

    fn available(&mut self) -> Result<usize, SinkError> {
        let s = self.0.borrow();
        if let Some(e) = &s.fault {
            return Err(e.clone());
        }
        match &s.available_error {
            Some(e) => Err(e.clone()),
            None => Ok(s.buffer_frames.saturating_sub(s.queued)),
        }
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, SinkError> {
        let mut s = self.0.borrow_mut();
        s.write_calls += 1;
        if let Some(e) = &s.fault {
            return Err(e.clone());
        }
        if let Some(e) = s.write_errors.pop_front() {
            return Err(e);
        }
        let room = s.buffer_frames.saturating_sub(s.queued);
        let frames = (samples.len() / 2).min(room);
        s.queued += frames;
        s.frames_accepted += frames as u64;
        Ok(frames)
    }

    fn recover(&mut self, _error: &SinkError) -> Result<(), SinkError> {
        let mut s = self.0.borrow_mut();
        s.recover_calls += 1;
        if s.fail_recovery {
            Err(SinkError::Device("recovery failed".to_string()))
        } else {
            s.fault = None;
            Ok(())
        }
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed = true;
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Backend that hands out one prepared [`ScriptedSink`].
pub struct ScriptedBackend(RefCell<Option<ScriptedSink>>);

impl ScriptedBackend {
    pub fn new(sink: ScriptedSink) -> Self {
        Self(RefCell::new(Some(sink)))
    }
}

impl SinkBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&self, _request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError> {
        self.0
            .borrow_mut()
            .take()
            .map(|sink| Box::new(sink) as Box<dyn AudioSink>)
            .ok_or(InitError::NoDevice)
    }
}

/// Backend whose open always fails.
pub struct FailingBackend(pub InitError);

impl SinkBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn open(&self, _request: &DeviceRequest) -> Result<Box<dyn AudioSink>, InitError> {
        Err(self.0.clone())
    }
}
