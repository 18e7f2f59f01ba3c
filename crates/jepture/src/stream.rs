// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Frame pump
//!
//! [`CaptureStream`] owns a capture session and hands out one round of
//! frames per [`CaptureStream::next`] call. The first call starts the
//! repeating request; the session is torn down when the stream is closed or
//! dropped.

use crate::{
    backend::{CaptureBackend, CaptureRequest},
    config::{CaptureConfig, Resolution},
    mode::SensorModeDescriptor,
    session::Session,
    Error,
};

/// One camera's frame in a round.
#[derive(Debug)]
pub struct FrameRecord<'a, T> {
    pub sequence_number: u64,
    /// Capture time in backend clock units.
    pub timestamp: u64,
    /// The camera's persistent native buffer, `None` if no frame of this
    /// camera has been captured without skipping yet.
    pub buffer: Option<&'a T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    Running,
    Closed,
}

/// Synchronized multi-camera capture.
///
/// Not reentrant: rounds are produced by one caller, one at a time.
pub struct CaptureStream<B: CaptureBackend> {
    session: Session<B>,
    backend: B,
    state: State,
}

impl<B: CaptureBackend> CaptureStream<B> {
    /// Builds the capture session for `config` on `backend`. Nothing is
    /// captured until the first [`CaptureStream::next`] call.
    pub fn open(mut backend: B, config: &CaptureConfig) -> Result<Self, Error> {
        let session = Session::build(&mut backend, config)?;
        Ok(CaptureStream {
            session,
            backend,
            state: State::NotStarted,
        })
    }

    /// Captures one frame from every camera, in configuration order.
    ///
    /// Blocks until each camera has delivered its next frame, so a round
    /// takes as long as the slowest camera. Frames are not aligned across
    /// cameras: each record carries its own camera's sequence number and
    /// timestamp, and these can drift apart between cameras.
    ///
    /// Unless `skip` is set, each camera's frame is copied into that
    /// camera's persistent buffer, allocated on first use and overwritten in
    /// place afterwards. The returned records borrow those buffers, so they
    /// must be consumed before the next call, which reuses them. With `skip`
    /// set no copy is made and the buffers keep their previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the repeating request is rejected on the
    /// first call, and [`Error::FrameAcquisition`] if any camera fails to
    /// deliver or copy a frame. A failed round returns no records; calling
    /// again retries.
    pub fn next(&mut self, skip: bool) -> Result<Vec<FrameRecord<'_, B::Buffer>>, Error> {
        match self.state {
            State::Closed => {
                return Err(Error::Session("capture stream is closed".to_string()));
            }
            State::NotStarted => {
                self.session.start(&mut self.backend)?;
                self.state = State::Running;
            }
            State::Running => {}
        }

        let round = self.session.acquire_round(&mut self.backend, skip)?;
        Ok(self
            .session
            .cameras()
            .iter()
            .zip(round)
            .map(|(camera, info)| FrameRecord {
                sequence_number: info.sequence_number,
                timestamp: info.timestamp,
                buffer: camera.buffer(),
            })
            .collect())
    }

    /// Tears the session down: stops the repeating request if it was
    /// started, waits for the session to drain, disconnects every stream and
    /// releases every buffer. Later calls do nothing.
    pub fn close(&mut self) {
        if self.state == State::Closed {
            return;
        }
        let started = self.state == State::Running;
        self.session.teardown(&mut self.backend, started);
        self.state = State::Closed;
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Camera names in round order.
    pub fn names(&self) -> Vec<&str> {
        self.session
            .cameras()
            .iter()
            .map(|camera| camera.name())
            .collect()
    }

    pub fn resolution(&self) -> Resolution {
        self.session.resolution()
    }

    pub fn sensor_mode(&self) -> &SensorModeDescriptor {
        self.session.mode()
    }

    pub fn request(&self) -> &CaptureRequest {
        self.session.request()
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: CaptureBackend> Drop for CaptureStream<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{
            synthetic::{Event, Fault, SyntheticBackend, SyntheticCamera, SyntheticProbe},
            NativeBuffer,
        },
        config::CameraRequest,
    };

    fn open(cameras: usize) -> (CaptureStream<SyntheticBackend>, SyntheticProbe) {
        let backend = SyntheticBackend::new(vec![SyntheticCamera::default(); cameras]);
        let probe = backend.probe();
        let config = CaptureConfig::new(
            (0..cameras as u32)
                .map(|id| CameraRequest::new(id, &format!("cam{}", id)))
                .collect(),
        )
        .with_resolution(16, 8);
        (CaptureStream::open(backend, &config).unwrap(), probe)
    }

    #[test]
    fn test_first_call_starts_repeat() {
        let (mut stream, probe) = open(1);
        assert!(!stream.is_running());
        assert!(probe.request().is_none());

        stream.next(true).unwrap();
        assert!(stream.is_running());
        stream.next(true).unwrap();
        assert_eq!(probe.count(&Event::RepeatStarted { sensor_mode: 0 }), 1);
    }

    #[test]
    fn test_skip_before_first_copy_is_empty() {
        let (mut stream, probe) = open(2);
        let records = stream.next(true).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|record| record.buffer.is_none()));
        drop(records);
        assert!(!probe
            .events()
            .iter()
            .any(|event| matches!(event, Event::BufferCreated { .. })));
    }

    #[test]
    fn test_buffer_allocated_once() {
        let (mut stream, probe) = open(2);
        for _ in 0..4 {
            stream.next(false).unwrap();
        }
        let created = probe
            .events()
            .iter()
            .filter(|event| matches!(event, Event::BufferCreated { .. }))
            .count();
        assert_eq!(created, 2);
    }

    #[test]
    fn test_records_in_camera_order() {
        let (mut stream, _probe) = open(3);
        assert_eq!(stream.names(), ["cam0", "cam1", "cam2"]);
        let records = stream.next(false).unwrap();
        let handles: Vec<i32> = records
            .iter()
            .map(|record| record.buffer.map(NativeBuffer::handle).unwrap_or(-1))
            .collect();
        assert!(handles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_failed_round_returns_error() {
        let (mut stream, probe) = open(2);
        stream.next(false).unwrap();
        probe.inject(Fault::AcquireFrame { camera: 1, after: 1 });
        assert!(matches!(stream.next(false), Err(Error::FrameAcquisition(_))));
        probe.clear(Fault::AcquireFrame { camera: 1, after: 1 });
        assert_eq!(stream.next(false).unwrap().len(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut stream, probe) = open(1);
        stream.next(false).unwrap();
        stream.close();
        stream.close();
        drop(stream);
        assert_eq!(probe.count(&Event::RepeatStopped), 1);
        assert_eq!(probe.count(&Event::Idle), 1);
        assert_eq!(probe.count(&Event::StreamDisconnected(0)), 1);
        assert_eq!(probe.count(&Event::BufferReleased { handle: 101 }), 1);
    }

    #[test]
    fn test_next_after_close() {
        let (mut stream, _probe) = open(1);
        stream.close();
        assert!(matches!(stream.next(false), Err(Error::Session(_))));
    }
}
