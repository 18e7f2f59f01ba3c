// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! In-memory capture backend.
//!
//! Fabricates sensors with configurable sensor mode tables and control
//! ranges, and delivers frames whose pixel content is a deterministic
//! function of camera and sequence number. Every lifecycle call is recorded
//! as an [`Event`] so tests can observe setup and teardown, and individual
//! calls can be made to fail with [`Fault`].
//!
//! ```
//! use jepture::backend::synthetic::{Event, SyntheticBackend, SyntheticCamera};
//! use jepture::config::{CameraRequest, CaptureConfig};
//! use jepture::stream::CaptureStream;
//!
//! let backend = SyntheticBackend::new(vec![SyntheticCamera::default(); 2]);
//! let probe = backend.probe();
//!
//! let config = CaptureConfig::new(vec![CameraRequest::new(1, "b"), CameraRequest::new(0, "a")])
//!     .with_resolution(64, 48);
//! let mut stream = CaptureStream::open(backend, &config)?;
//! assert_eq!(stream.next(false)?.len(), 2);
//! drop(stream);
//!
//! assert!(probe.events().contains(&Event::RepeatStopped));
//! # Ok::<(), jepture::Error>(())
//! ```

use super::{
    CaptureBackend, CaptureRequest, CapturedFrame, ControlDefaults, NativeBuffer, OpticalBlack,
    StreamTemplate, ValueRange,
};
use crate::{config::Resolution, mode::SensorModeDescriptor, yuv::Yuv420Image, Error};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle calls observed by a [`SyntheticBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SessionCreated(Vec<u32>),
    SessionDestroyed,
    StreamCreated(u32),
    StreamDisconnected(u32),
    StreamDestroyed(u32),
    ConsumerCreated(u32),
    ConsumerDestroyed(u32),
    RepeatStarted { sensor_mode: u32 },
    RepeatStopped,
    Idle,
    FrameAcquired { camera: u32, number: u64 },
    FrameReleased { camera: u32, number: u64 },
    BufferCreated { camera: u32, handle: i32 },
    BufferCopied { camera: u32, handle: i32 },
    BufferReleased { handle: i32 },
}

/// Calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    CreateSession,
    /// Stream creation for the given sensor.
    CreateStream(u32),
    /// Consumer creation for the given sensor.
    CreateConsumer(u32),
    ControlDefaults,
    StartRepeat,
    /// Frame delivery of the given sensor once it has delivered `after`
    /// frames.
    AcquireFrame { camera: u32, after: u64 },
    CreateBuffer,
    CopyBuffer,
}

/// Description of one fabricated sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticCamera {
    pub modes: Vec<SensorModeDescriptor>,
    pub defaults: ControlDefaults,
    /// Sequence number of the first delivered frame.
    pub first_frame: u64,
    /// Frames expose native buffer interop.
    pub native_buffers: bool,
}

impl Default for SyntheticCamera {
    /// A 1080p sensor with modes at 60, 30 and 15 fps maximum.
    fn default() -> Self {
        let resolution = Resolution::new(1920, 1080);
        SyntheticCamera {
            modes: vec![
                SensorModeDescriptor {
                    index: 0,
                    min_frame_duration_ns: 16_666_667,
                    max_frame_duration_ns: 683_709_000,
                    resolution,
                },
                SensorModeDescriptor {
                    index: 1,
                    min_frame_duration_ns: 33_333_334,
                    max_frame_duration_ns: 683_709_000,
                    resolution,
                },
                SensorModeDescriptor {
                    index: 2,
                    min_frame_duration_ns: 66_666_667,
                    max_frame_duration_ns: 683_709_000,
                    resolution,
                },
            ],
            defaults: ControlDefaults {
                isp_digital_gain: ValueRange::new(1.0, 256.0),
                gain: ValueRange::new(1.0, 16.0),
                exposure_time: ValueRange::new(34_000.0, 550_385_000.0),
                optical_black: OpticalBlack {
                    r: 0.0625,
                    g_even: 0.0625,
                    g_odd: 0.0625,
                    b: 0.0625,
                },
            },
            first_frame: 0,
            native_buffers: true,
        }
    }
}

impl SyntheticCamera {
    pub fn with_modes(self, modes: Vec<SensorModeDescriptor>) -> Self {
        SyntheticCamera { modes, ..self }
    }

    pub fn with_defaults(self, defaults: ControlDefaults) -> Self {
        SyntheticCamera { defaults, ..self }
    }

    pub fn with_first_frame(self, first_frame: u64) -> Self {
        SyntheticCamera {
            first_frame,
            ..self
        }
    }

    pub fn without_native_buffers(self) -> Self {
        SyntheticCamera {
            native_buffers: false,
            ..self
        }
    }
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    faults: Vec<Fault>,
    request: Option<CaptureRequest>,
    delivered: Vec<u64>,
    next_handle: i32,
    running: bool,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(state: &Shared, event: Event) {
    log::trace!("synthetic: {:?}", event);
    lock(state).events.push(event);
}

/// Observes a [`SyntheticBackend`] after it has been moved into a session.
#[derive(Debug, Clone)]
pub struct SyntheticProbe {
    state: Shared,
}

impl SyntheticProbe {
    /// Every lifecycle event so far, in call order.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.state).events.clone()
    }

    /// Number of recorded events equal to `event`.
    pub fn count(&self, event: &Event) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|recorded| *recorded == event)
            .count()
    }

    /// The most recently submitted repeating request.
    pub fn request(&self) -> Option<CaptureRequest> {
        lock(&self.state).request
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Arms `fault` for every later matching call.
    pub fn inject(&self, fault: Fault) {
        lock(&self.state).faults.push(fault);
    }

    /// Disarms `fault`.
    pub fn clear(&self, fault: Fault) {
        lock(&self.state).faults.retain(|armed| *armed != fault);
    }
}

/// Capture backend fabricating sensors and frames in memory.
#[derive(Debug)]
pub struct SyntheticBackend {
    cameras: Vec<SyntheticCamera>,
    state: Shared,
}

impl SyntheticBackend {
    pub fn new(cameras: Vec<SyntheticCamera>) -> Self {
        let state = State {
            delivered: vec![0; cameras.len()],
            next_handle: 100,
            ..Default::default()
        };
        SyntheticBackend {
            cameras,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Arms `fault` before the backend is handed to a session.
    pub fn with_fault(self, fault: Fault) -> Self {
        lock(&self.state).faults.push(fault);
        self
    }

    pub fn probe(&self) -> SyntheticProbe {
        SyntheticProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn armed(&self, fault: Fault) -> bool {
        lock(&self.state).faults.contains(&fault)
    }

    fn camera(&self, index: u32) -> Result<&SyntheticCamera, Error> {
        self.cameras
            .get(index as usize)
            .ok_or_else(|| Error::Session(format!("no synthetic sensor {}", index)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSensor {
    index: u32,
}

impl SyntheticSensor {
    pub fn index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
pub struct SyntheticSession {
    state: Shared,
}

impl Drop for SyntheticSession {
    fn drop(&mut self) {
        record(&self.state, Event::SessionDestroyed);
    }
}

#[derive(Debug)]
pub struct SyntheticStream {
    camera: u32,
    resolution: Resolution,
    connected: bool,
    state: Shared,
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        record(&self.state, Event::StreamDestroyed(self.camera));
    }
}

#[derive(Debug)]
pub struct SyntheticConsumer {
    camera: u32,
    resolution: Resolution,
    state: Shared,
}

impl Drop for SyntheticConsumer {
    fn drop(&mut self) {
        record(&self.state, Event::ConsumerDestroyed(self.camera));
    }
}

#[derive(Debug)]
pub struct SyntheticFrame {
    camera: u32,
    number: u64,
    timestamp: u64,
    resolution: Resolution,
    native: bool,
    state: Shared,
}

impl SyntheticFrame {
    /// Fills `image` with the frame content: a luma ramp offset by the
    /// sequence number, chroma keyed to the camera.
    fn render(&self, image: &mut Yuv420Image) {
        let width = image.resolution().width as usize;
        let seed = (self.number as usize).wrapping_mul(7);
        let (y, u, v) = image.planes_mut();
        for (index, luma) in y.iter_mut().enumerate() {
            let column = index % width.max(1);
            *luma = (column + seed) as u8;
        }
        u.fill((64 + self.camera * 32) as u8);
        v.fill((192u32.wrapping_sub(self.camera * 32)) as u8);
    }
}

impl CapturedFrame for SyntheticFrame {
    fn number(&self) -> u64 {
        self.number
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl Drop for SyntheticFrame {
    fn drop(&mut self) {
        record(
            &self.state,
            Event::FrameReleased {
                camera: self.camera,
                number: self.number,
            },
        );
    }
}

/// Native buffer held in memory.
#[derive(Debug)]
pub struct SyntheticBuffer {
    handle: i32,
    image: Yuv420Image,
    state: Shared,
}

impl SyntheticBuffer {
    pub fn image(&self) -> &Yuv420Image {
        &self.image
    }
}

impl NativeBuffer for SyntheticBuffer {
    fn handle(&self) -> i32 {
        self.handle
    }

    fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    fn read_yuv420(&self, dst: &mut Yuv420Image) -> Result<(), Error> {
        if dst.resolution() != self.image.resolution() {
            return Err(Error::FrameAcquisition(format!(
                "cannot read {} buffer into {} image",
                self.image.resolution(),
                dst.resolution()
            )));
        }
        dst.clone_from(&self.image);
        Ok(())
    }
}

impl Drop for SyntheticBuffer {
    fn drop(&mut self) {
        record(
            &self.state,
            Event::BufferReleased {
                handle: self.handle,
            },
        );
    }
}

fn check_range(name: &str, range: &ValueRange) -> Result<(), Error> {
    if range.min > range.max {
        return Err(Error::Session(format!(
            "capture request rejected: {} range {} is inverted",
            name, range
        )));
    }
    Ok(())
}

impl CaptureBackend for SyntheticBackend {
    type Sensor = SyntheticSensor;
    type Session = SyntheticSession;
    type Stream = SyntheticStream;
    type Consumer = SyntheticConsumer;
    type Frame = SyntheticFrame;
    type Buffer = SyntheticBuffer;

    fn version(&self) -> String {
        format!("synthetic {}", env!("CARGO_PKG_VERSION"))
    }

    fn enumerate_sensors(&mut self) -> Result<Vec<SyntheticSensor>, Error> {
        Ok((0..self.cameras.len() as u32)
            .map(|index| SyntheticSensor { index })
            .collect())
    }

    fn sensor_modes(
        &mut self,
        sensor: &SyntheticSensor,
    ) -> Result<Vec<SensorModeDescriptor>, Error> {
        Ok(self.camera(sensor.index)?.modes.clone())
    }

    fn create_session(&mut self, sensors: &[SyntheticSensor]) -> Result<SyntheticSession, Error> {
        if self.armed(Fault::CreateSession) {
            return Err(Error::Session("injected session failure".to_string()));
        }
        record(
            &self.state,
            Event::SessionCreated(sensors.iter().map(|sensor| sensor.index).collect()),
        );
        Ok(SyntheticSession {
            state: Arc::clone(&self.state),
        })
    }

    fn create_stream(
        &mut self,
        _session: &mut SyntheticSession,
        sensor: &SyntheticSensor,
        template: &StreamTemplate,
    ) -> Result<SyntheticStream, Error> {
        if self.armed(Fault::CreateStream(sensor.index)) {
            return Err(Error::Session(format!(
                "injected stream failure for sensor {}",
                sensor.index
            )));
        }
        record(&self.state, Event::StreamCreated(sensor.index));
        Ok(SyntheticStream {
            camera: sensor.index,
            resolution: template.resolution,
            connected: true,
            state: Arc::clone(&self.state),
        })
    }

    fn create_consumer(&mut self, stream: &mut SyntheticStream) -> Result<SyntheticConsumer, Error> {
        if self.armed(Fault::CreateConsumer(stream.camera)) {
            return Err(Error::Session(format!(
                "injected consumer failure for sensor {}",
                stream.camera
            )));
        }
        record(&self.state, Event::ConsumerCreated(stream.camera));
        Ok(SyntheticConsumer {
            camera: stream.camera,
            resolution: stream.resolution,
            state: Arc::clone(&self.state),
        })
    }

    fn control_defaults(
        &mut self,
        _session: &mut SyntheticSession,
        sensor: &SyntheticSensor,
        _mode: &SensorModeDescriptor,
    ) -> Result<ControlDefaults, Error> {
        if self.armed(Fault::ControlDefaults) {
            return Err(Error::Session("injected control defaults failure".to_string()));
        }
        Ok(self.camera(sensor.index)?.defaults)
    }

    fn start_repeat(
        &mut self,
        _session: &mut SyntheticSession,
        request: &CaptureRequest,
        streams: &[&SyntheticStream],
    ) -> Result<(), Error> {
        if self.armed(Fault::StartRepeat) {
            return Err(Error::Session("injected repeat failure".to_string()));
        }
        check_range("ISP digital gain", &request.controls.isp_digital_gain)?;
        check_range("gain", &request.controls.gain)?;
        check_range("exposure time", &request.controls.exposure_time)?;
        if streams.iter().any(|stream| !stream.connected) {
            return Err(Error::Session(
                "capture request references a disconnected stream".to_string(),
            ));
        }

        let mut state = lock(&self.state);
        state.request = Some(*request);
        state.running = true;
        drop(state);
        record(
            &self.state,
            Event::RepeatStarted {
                sensor_mode: request.sensor_mode,
            },
        );
        Ok(())
    }

    fn stop_repeat(&mut self, _session: &mut SyntheticSession) -> Result<(), Error> {
        lock(&self.state).running = false;
        record(&self.state, Event::RepeatStopped);
        Ok(())
    }

    fn wait_for_idle(&mut self, _session: &mut SyntheticSession) -> Result<(), Error> {
        record(&self.state, Event::Idle);
        Ok(())
    }

    fn disconnect_stream(&mut self, stream: &mut SyntheticStream) -> Result<(), Error> {
        stream.connected = false;
        record(&self.state, Event::StreamDisconnected(stream.camera));
        Ok(())
    }

    fn acquire_frame(&mut self, consumer: &mut SyntheticConsumer) -> Result<SyntheticFrame, Error> {
        let camera = self.camera(consumer.camera)?;
        let (first_frame, native) = (camera.first_frame, camera.native_buffers);

        let mut state = lock(&self.state);
        let Some(request) = state.request.filter(|_| state.running) else {
            return Err(Error::FrameAcquisition(format!(
                "sensor {} is not streaming",
                consumer.camera
            )));
        };
        let delivered = state.delivered[consumer.camera as usize];
        let fault = Fault::AcquireFrame {
            camera: consumer.camera,
            after: delivered,
        };
        if state.faults.contains(&fault) {
            return Err(Error::FrameAcquisition(format!(
                "injected frame failure for sensor {}",
                consumer.camera
            )));
        }
        state.delivered[consumer.camera as usize] = delivered + 1;
        drop(state);

        let number = first_frame + delivered;
        record(
            &self.state,
            Event::FrameAcquired {
                camera: consumer.camera,
                number,
            },
        );
        Ok(SyntheticFrame {
            camera: consumer.camera,
            number,
            timestamp: number * request.frame_duration_ns,
            resolution: consumer.resolution,
            native,
            state: Arc::clone(&self.state),
        })
    }

    fn create_native_buffer(
        &mut self,
        frame: &SyntheticFrame,
        resolution: Resolution,
    ) -> Result<SyntheticBuffer, Error> {
        if !frame.native {
            return Err(Error::FrameAcquisition(
                "frame image does not support native buffers".to_string(),
            ));
        }
        if self.armed(Fault::CreateBuffer) || resolution != frame.resolution {
            return Err(Error::FrameAcquisition(format!(
                "failed to create {} native buffer",
                resolution
            )));
        }

        let handle = {
            let mut state = lock(&self.state);
            state.next_handle += 1;
            state.next_handle
        };
        let mut image = Yuv420Image::new(resolution);
        frame.render(&mut image);
        record(
            &self.state,
            Event::BufferCreated {
                camera: frame.camera,
                handle,
            },
        );
        Ok(SyntheticBuffer {
            handle,
            image,
            state: Arc::clone(&self.state),
        })
    }

    fn copy_to_native_buffer(
        &mut self,
        frame: &SyntheticFrame,
        buffer: &mut SyntheticBuffer,
    ) -> Result<(), Error> {
        if !frame.native {
            return Err(Error::FrameAcquisition(
                "frame image does not support native buffers".to_string(),
            ));
        }
        if self.armed(Fault::CopyBuffer) {
            return Err(Error::FrameAcquisition(format!(
                "injected copy failure into buffer {}",
                buffer.handle
            )));
        }
        frame.render(&mut buffer.image);
        record(
            &self.state,
            Event::BufferCopied {
                camera: frame.camera,
                handle: buffer.handle,
            },
        );
        Ok(())
    }
}
