// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Capture session construction
//!
//! Builds one backend session spanning every requested camera, one output
//! stream and frame consumer per camera from a shared stream template, the
//! negotiated sensor mode, and the single repeating request shared by all
//! cameras. A failure at any step drops whatever was already created.

use crate::{
    backend::{CaptureBackend, CaptureRequest, CapturedFrame, ControlDefaults, StreamTemplate},
    config::{CaptureConfig, Resolution},
    enumerator::claim_sensors,
    mode::{self, ModeChoice, SensorModeDescriptor},
    Error,
};

/// Per-camera resources, owned for the lifetime of the session.
///
/// The buffer slot is filled on the first non-skipped frame and then only
/// ever overwritten in place.
pub struct CameraStream<B: CaptureBackend> {
    name: String,
    // Fields drop in declaration order: buffer, consumer, then stream.
    buffer: Option<B::Buffer>,
    consumer: B::Consumer,
    stream: B::Stream,
    sensor: B::Sensor,
    modes: Vec<SensorModeDescriptor>,
}

impl<B: CaptureBackend> CameraStream<B> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sensor(&self) -> &B::Sensor {
        &self.sensor
    }

    /// Sensor modes the camera reported, in hardware order and numbered by
    /// position.
    pub fn modes(&self) -> &[SensorModeDescriptor] {
        &self.modes
    }

    /// The persistent buffer, `None` until the first non-skipped frame.
    pub fn buffer(&self) -> Option<&B::Buffer> {
        self.buffer.as_ref()
    }
}

/// Sequence number and timestamp of one camera's frame in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameInfo {
    pub sequence_number: u64,
    pub timestamp: u64,
}

/// Every backend resource of one capture session.
pub struct Session<B: CaptureBackend> {
    cameras: Vec<CameraStream<B>>,
    session: B::Session,
    mode: SensorModeDescriptor,
    request: CaptureRequest,
    resolution: Resolution,
}

impl<B: CaptureBackend> Session<B> {
    /// Enumerates and claims sensors, creates the session, streams and
    /// consumers, negotiates the sensor mode and builds the capture request.
    pub fn build(backend: &mut B, config: &CaptureConfig) -> Result<Self, Error> {
        config.validate()?;
        log::info!("capture backend: {}", backend.version());

        let sensors = claim_sensors(&config.cameras, backend.enumerate_sensors()?)?;
        let mut modes = Vec::with_capacity(sensors.len());
        for sensor in &sensors {
            modes.push(positioned(backend.sensor_modes(sensor)?));
        }

        let mut session = backend.create_session(&sensors)?;

        let template = StreamTemplate::new(config.resolution);
        let mut cameras = Vec::with_capacity(sensors.len());
        for ((request, sensor), modes) in config.cameras.iter().zip(sensors).zip(modes) {
            let mut stream = backend.create_stream(&mut session, &sensor, &template)?;
            let consumer = backend.create_consumer(&mut stream)?;
            log::debug!(
                "camera \"{}\" stream {} {} created",
                request.name,
                template.resolution,
                template.pixel_format
            );
            cameras.push(CameraStream {
                name: request.name.clone(),
                buffer: None,
                consumer,
                stream,
                sensor,
                modes,
            });
        }

        let mode = negotiate(&cameras, config)?;
        log::info!(
            "sensor mode {} selected for {} camera(s): {}",
            mode.index,
            cameras.len(),
            mode
        );

        let defaults = shared_defaults(backend, &mut session, &cameras, &mode)?;
        let controls = match &config.settings {
            Some(overlay) => overlay.apply(&defaults)?,
            None => defaults.into(),
        };
        let request = CaptureRequest {
            sensor_mode: mode.index,
            frame_duration_ns: mode::frame_duration_ns(config.fps),
            controls,
        };
        log::debug!("capture request: {:?}", request);

        Ok(Session {
            cameras,
            session,
            mode,
            request,
            resolution: config.resolution,
        })
    }

    pub fn cameras(&self) -> &[CameraStream<B>] {
        &self.cameras
    }

    pub fn mode(&self) -> &SensorModeDescriptor {
        &self.mode
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Submits the shared request as the repeating request.
    pub(crate) fn start(&mut self, backend: &mut B) -> Result<(), Error> {
        let streams: Vec<&B::Stream> = self.cameras.iter().map(|camera| &camera.stream).collect();
        backend.start_repeat(&mut self.session, &self.request, &streams)?;
        log::info!(
            "repeating capture started at {} ns per frame",
            self.request.frame_duration_ns
        );
        Ok(())
    }

    /// Acquires one frame from every camera, in session order, and unless
    /// `skip` refreshes each camera's persistent buffer.
    pub(crate) fn acquire_round(
        &mut self,
        backend: &mut B,
        skip: bool,
    ) -> Result<Vec<FrameInfo>, Error> {
        let resolution = self.resolution;
        let mut round = Vec::with_capacity(self.cameras.len());

        for camera in &mut self.cameras {
            let frame = backend.acquire_frame(&mut camera.consumer)?;
            let info = FrameInfo {
                sequence_number: frame.number(),
                timestamp: frame.timestamp(),
            };
            log::trace!(
                "camera \"{}\" frame {} at {}",
                camera.name,
                info.sequence_number,
                info.timestamp
            );

            if !skip {
                match camera.buffer.as_mut() {
                    Some(buffer) => backend.copy_to_native_buffer(&frame, buffer)?,
                    None => {
                        let buffer = backend.create_native_buffer(&frame, resolution)?;
                        log::debug!(
                            "camera \"{}\" native buffer {} allocated",
                            camera.name,
                            resolution
                        );
                        camera.buffer = Some(buffer);
                    }
                }
            }

            round.push(info);
        }

        Ok(round)
    }

    /// Stops the repeating request if `started`, waits for the session to
    /// drain, disconnects every stream and releases every buffer. Errors are
    /// logged, never returned.
    pub(crate) fn teardown(&mut self, backend: &mut B, started: bool) {
        if started {
            match backend.stop_repeat(&mut self.session) {
                Ok(()) => log::info!("repeating capture stopped"),
                Err(err) => log::warn!("failed to stop repeating capture: {}", err),
            }
        }
        if let Err(err) = backend.wait_for_idle(&mut self.session) {
            log::warn!("capture session did not become idle: {}", err);
        }
        for camera in &mut self.cameras {
            if let Err(err) = backend.disconnect_stream(&mut camera.stream) {
                log::warn!("camera \"{}\": {}", camera.name, err);
            }
        }
        for camera in &mut self.cameras {
            camera.buffer.take();
        }
    }
}

/// Numbers each mode by its position in the table, which is the index
/// requests and explicit mode choices refer to.
fn positioned(modes: Vec<SensorModeDescriptor>) -> Vec<SensorModeDescriptor> {
    modes
        .into_iter()
        .zip(0u32..)
        .map(|(mode, index)| SensorModeDescriptor { index, ..mode })
        .collect()
}

/// Control ranges every camera supports in `mode`. The shared request may
/// only use values inside each camera's own ranges.
fn shared_defaults<B: CaptureBackend>(
    backend: &mut B,
    session: &mut B::Session,
    cameras: &[CameraStream<B>],
    mode: &SensorModeDescriptor,
) -> Result<ControlDefaults, Error> {
    let mut shared: Option<ControlDefaults> = None;
    for camera in cameras {
        let reported = backend.control_defaults(session, &camera.sensor, mode)?;
        log::debug!("camera \"{}\" control defaults: {:?}", camera.name, reported);
        shared = Some(match shared {
            None => reported,
            Some(defaults) => defaults.intersect(&reported).ok_or_else(|| {
                Error::Session(format!(
                    "control ranges of camera \"{}\" do not overlap the other cameras",
                    camera.name
                ))
            })?,
        });
    }
    shared.ok_or_else(|| Error::Session("no cameras to read control defaults from".to_string()))
}

/// Resolves one mode per camera, requires them to agree, then requires the
/// agreed index to exist for every camera.
fn negotiate<B: CaptureBackend>(
    cameras: &[CameraStream<B>],
    config: &CaptureConfig,
) -> Result<SensorModeDescriptor, Error> {
    let mut choices: Vec<ModeChoice> = Vec::with_capacity(cameras.len());
    for (camera, request) in cameras.iter().zip(&config.cameras) {
        let choice = mode::resolve_mode(
            &camera.name,
            &camera.modes,
            config.fps,
            request.sensor_mode,
            config.sensor_mode,
        )?;
        log::debug!("camera \"{}\" sensor mode {:?}", camera.name, choice);
        choices.push(choice);
    }

    let index = mode::agree(&choices)?;
    let mut agreed = None;
    for camera in cameras {
        let descriptor = mode::mode_at(&camera.name, &camera.modes, index)?;
        agreed.get_or_insert(*descriptor);
    }

    agreed.ok_or_else(|| Error::Session("no cameras to negotiate a sensor mode for".to_string()))
}
