// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Hardware backend driving the capture shim loaded by `jepture-sys`.

use super::{
    CaptureBackend, CaptureRequest, CapturedFrame, ControlDefaults, DenoiseMode, NativeBuffer,
    OpticalBlack, PixelFormat, StreamTemplate, ValueRange,
};
use crate::{config::Resolution, mode::SensorModeDescriptor, yuv::Yuv420Image, Error};
use dma_buf::DmaBuf;
use jepture_sys as ffi;
use std::{
    ffi::{c_int, CStr},
    fmt,
    os::fd::{AsFd, BorrowedFd, FromRawFd, IntoRawFd, RawFd},
    rc::Rc,
};

#[derive(Debug)]
struct Provider {
    ptr: *mut ffi::jep_provider,
}

impl Drop for Provider {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            unsafe { lib.jep_provider_destroy(self.ptr) };
        }
    }
}

/// Capture backend for the camera hardware.
///
/// Loads `libjepture_argus.so` (or `JEPTURE_ARGUS_LIBRARY`) on first use and
/// opens the camera provider.
#[derive(Debug)]
pub struct ArgusBackend {
    provider: Rc<Provider>,
}

impl ArgusBackend {
    pub fn new() -> Result<Self, Error> {
        let ptr = argus!(jep_provider_create());
        if ptr.is_null() {
            return Err(Error::Session(
                "failed to create camera provider".to_string(),
            ));
        }

        let backend = ArgusBackend {
            provider: Rc::new(Provider { ptr }),
        };
        log::info!("camera provider: {}", backend.version());
        Ok(backend)
    }
}

/// Physical sensor, identified by its index in provider order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgusSensor {
    device: u32,
}

impl ArgusSensor {
    pub fn device(&self) -> u32 {
        self.device
    }
}

#[derive(Debug)]
pub struct ArgusSession {
    ptr: *mut ffi::jep_session,
    _provider: Rc<Provider>,
}

impl Drop for ArgusSession {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            unsafe { lib.jep_session_destroy(self.ptr) };
        }
    }
}

#[derive(Debug)]
pub struct ArgusStream {
    ptr: *mut ffi::jep_stream,
    device: u32,
}

impl ArgusStream {
    pub fn device(&self) -> u32 {
        self.device
    }
}

impl Drop for ArgusStream {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            unsafe { lib.jep_stream_destroy(self.ptr) };
        }
    }
}

#[derive(Debug)]
pub struct ArgusConsumer {
    ptr: *mut ffi::jep_consumer,
}

impl Drop for ArgusConsumer {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            unsafe { lib.jep_consumer_destroy(self.ptr) };
        }
    }
}

/// An acquired frame, returned to its stream when dropped.
#[derive(Debug)]
pub struct ArgusFrame {
    ptr: *mut ffi::jep_frame,
    number: u64,
    timestamp: u64,
}

impl ArgusFrame {
    fn has_native_buffer(&self) -> Result<bool, Error> {
        Ok(argus!(jep_frame_has_native_buffer(self.ptr)) != 0)
    }
}

impl CapturedFrame for ArgusFrame {
    fn number(&self) -> u64 {
        self.number
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl Drop for ArgusFrame {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            unsafe { lib.jep_frame_release(self.ptr) };
        }
    }
}

/// Block-linear YUV 4:2:0 NvBuffer shared through a DMA file descriptor.
#[derive(Debug)]
pub struct ArgusBuffer {
    fd: RawFd,
    resolution: Resolution,
}

impl ArgusBuffer {
    pub fn fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }

    pub fn rawfd(&self) -> RawFd {
        self.fd
    }

    /// Returns a DMA buffer view over a duplicate of the descriptor, leaving
    /// the NvBuffer itself owned by the stream.
    pub fn dmabuf(&self) -> Result<DmaBuf, Error> {
        let fd = self.as_fd().try_clone_to_owned()?;
        Ok(unsafe { DmaBuf::from_raw_fd(fd.into_raw_fd()) })
    }
}

impl AsFd for ArgusBuffer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd()
    }
}

impl NativeBuffer for ArgusBuffer {
    fn handle(&self) -> i32 {
        self.fd
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read_yuv420(&self, dst: &mut Yuv420Image) -> Result<(), Error> {
        if dst.resolution() != self.resolution {
            return Err(Error::FrameAcquisition(format!(
                "cannot read {} buffer into {} image",
                self.resolution,
                dst.resolution()
            )));
        }

        let (y, u, v) = dst.planes_mut();
        let ret = argus!(jep_nvbuffer_read_yuv420(
            self.fd,
            y.as_mut_ptr(),
            u.as_mut_ptr(),
            v.as_mut_ptr(),
            self.resolution.width,
            self.resolution.height
        ));
        if ret != 0 {
            return Err(Error::FrameAcquisition(format!(
                "failed to read native buffer fd:{}",
                self.fd
            )));
        }
        Ok(())
    }
}

impl Drop for ArgusBuffer {
    fn drop(&mut self) {
        if let Ok(lib) = ffi::init() {
            let _ = unsafe { lib.jep_nvbuffer_destroy(self.fd) };
        }
    }
}

impl fmt::Display for ArgusBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} YUV420 fd:{}", self.resolution, self.fd)
    }
}

fn range_to_ffi(range: ValueRange) -> ffi::jep_range {
    ffi::jep_range {
        min: range.min,
        max: range.max,
    }
}

fn range_from_ffi(range: ffi::jep_range) -> ValueRange {
    ValueRange::new(range.min, range.max)
}

fn request_to_ffi(request: &CaptureRequest) -> ffi::jep_request {
    let controls = &request.controls;
    let (optical_black_enable, optical_black) = match controls.optical_black {
        Some(black) => (1, [black.r, black.g_even, black.g_odd, black.b]),
        None => (0, [0.0; 4]),
    };

    ffi::jep_request {
        sensor_mode: request.sensor_mode,
        frame_duration_ns: request.frame_duration_ns,
        isp_digital_gain: range_to_ffi(controls.isp_digital_gain),
        gain: range_to_ffi(controls.gain),
        exposure_time: range_to_ffi(controls.exposure_time),
        optical_black_enable,
        optical_black,
        denoise_mode: match controls.denoise_mode {
            None => ffi::JEP_DENOISE_DEFAULT,
            Some(DenoiseMode::Off) => ffi::JEP_DENOISE_OFF,
            Some(DenoiseMode::Fast) => ffi::JEP_DENOISE_FAST,
            Some(DenoiseMode::HighQuality) => ffi::JEP_DENOISE_HIGH_QUALITY,
        },
        denoise_strength_enable: controls.denoise_strength.is_some() as i32,
        denoise_strength: controls.denoise_strength.unwrap_or(0.0) as f32,
    }
}

fn pixel_format_to_ffi(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::YCbCr420 => ffi::JEP_PIXEL_FMT_YCBCR_420_888,
    }
}

impl CaptureBackend for ArgusBackend {
    type Sensor = ArgusSensor;
    type Session = ArgusSession;
    type Stream = ArgusStream;
    type Consumer = ArgusConsumer;
    type Frame = ArgusFrame;
    type Buffer = ArgusBuffer;

    fn version(&self) -> String {
        let Ok(lib) = ffi::init() else {
            return String::from("argus (unloaded)");
        };
        let ptr = unsafe { lib.jep_provider_version(self.provider.ptr) };
        if ptr.is_null() {
            return String::from("argus");
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    fn enumerate_sensors(&mut self) -> Result<Vec<ArgusSensor>, Error> {
        let count = argus!(jep_provider_device_count(self.provider.ptr));
        log::debug!("camera provider reports {} device(s)", count);
        Ok((0..count).map(|device| ArgusSensor { device }).collect())
    }

    fn sensor_modes(&mut self, sensor: &ArgusSensor) -> Result<Vec<SensorModeDescriptor>, Error> {
        let count = argus!(jep_device_sensor_mode_count(
            self.provider.ptr,
            sensor.device
        ));
        if count < 0 {
            return Err(Error::Session(format!(
                "failed to query sensor modes of device {}",
                sensor.device
            )));
        }

        let mut modes = Vec::with_capacity(count as usize);
        for index in 0..count as u32 {
            let mut mode = ffi::jep_sensor_mode::default();
            if argus!(jep_device_sensor_mode(
                self.provider.ptr,
                sensor.device,
                index,
                &mut mode
            )) != 0
            {
                return Err(Error::Session(format!(
                    "failed to query sensor mode {} of device {}",
                    index, sensor.device
                )));
            }
            modes.push(SensorModeDescriptor {
                index,
                min_frame_duration_ns: mode.min_frame_duration_ns,
                max_frame_duration_ns: mode.max_frame_duration_ns,
                resolution: Resolution::new(mode.width, mode.height),
            });
        }
        Ok(modes)
    }

    fn create_session(&mut self, sensors: &[ArgusSensor]) -> Result<ArgusSession, Error> {
        let devices: Vec<u32> = sensors.iter().map(|sensor| sensor.device).collect();
        let ptr = argus!(jep_session_create(
            self.provider.ptr,
            devices.as_ptr(),
            devices.len()
        ));
        if ptr.is_null() {
            return Err(Error::Session(format!(
                "failed to create capture session for devices {:?}",
                devices
            )));
        }
        Ok(ArgusSession {
            ptr,
            _provider: Rc::clone(&self.provider),
        })
    }

    fn create_stream(
        &mut self,
        session: &mut ArgusSession,
        sensor: &ArgusSensor,
        template: &StreamTemplate,
    ) -> Result<ArgusStream, Error> {
        let ptr = argus!(jep_stream_create(
            session.ptr,
            sensor.device,
            template.resolution.width,
            template.resolution.height,
            pixel_format_to_ffi(template.pixel_format)
        ));
        if ptr.is_null() {
            return Err(Error::Session(format!(
                "failed to create {} {} output stream for device {}",
                template.resolution, template.pixel_format, sensor.device
            )));
        }
        Ok(ArgusStream {
            ptr,
            device: sensor.device,
        })
    }

    fn create_consumer(&mut self, stream: &mut ArgusStream) -> Result<ArgusConsumer, Error> {
        let ptr = argus!(jep_consumer_create(stream.ptr));
        if ptr.is_null() {
            return Err(Error::Session(format!(
                "failed to create frame consumer for device {}",
                stream.device
            )));
        }
        Ok(ArgusConsumer { ptr })
    }

    fn control_defaults(
        &mut self,
        session: &mut ArgusSession,
        sensor: &ArgusSensor,
        mode: &SensorModeDescriptor,
    ) -> Result<ControlDefaults, Error> {
        let mut out = ffi::jep_control_defaults::default();
        if argus!(jep_session_control_defaults(
            session.ptr,
            sensor.device,
            mode.index,
            &mut out
        )) != 0
        {
            return Err(Error::Session(format!(
                "failed to read control defaults of device {} in {}",
                sensor.device, mode
            )));
        }

        let [r, g_even, g_odd, b] = out.optical_black;
        Ok(ControlDefaults {
            isp_digital_gain: range_from_ffi(out.isp_digital_gain),
            gain: range_from_ffi(out.gain),
            exposure_time: range_from_ffi(out.exposure_time),
            optical_black: OpticalBlack { r, g_even, g_odd, b },
        })
    }

    fn start_repeat(
        &mut self,
        session: &mut ArgusSession,
        request: &CaptureRequest,
        streams: &[&ArgusStream],
    ) -> Result<(), Error> {
        let req = request_to_ffi(request);
        let ptrs: Vec<*mut ffi::jep_stream> = streams.iter().map(|stream| stream.ptr).collect();
        if argus!(jep_session_repeat(session.ptr, &req, ptrs.as_ptr(), ptrs.len())) != 0 {
            return Err(Error::Session(
                "capture request rejected by the capture session".to_string(),
            ));
        }
        Ok(())
    }

    fn stop_repeat(&mut self, session: &mut ArgusSession) -> Result<(), Error> {
        if argus!(jep_session_stop_repeat(session.ptr)) != 0 {
            return Err(Error::Session("failed to stop repeating request".to_string()));
        }
        Ok(())
    }

    fn wait_for_idle(&mut self, session: &mut ArgusSession) -> Result<(), Error> {
        if argus!(jep_session_wait_for_idle(session.ptr)) != 0 {
            return Err(Error::Session(
                "failed waiting for capture session to idle".to_string(),
            ));
        }
        Ok(())
    }

    fn disconnect_stream(&mut self, stream: &mut ArgusStream) -> Result<(), Error> {
        if argus!(jep_stream_disconnect(stream.ptr)) != 0 {
            return Err(Error::Session(format!(
                "failed to disconnect stream of device {}",
                stream.device
            )));
        }
        Ok(())
    }

    fn acquire_frame(&mut self, consumer: &mut ArgusConsumer) -> Result<ArgusFrame, Error> {
        let mut number = 0u64;
        let mut timestamp = 0u64;
        let ptr = argus!(jep_consumer_acquire_frame(
            consumer.ptr,
            &mut number,
            &mut timestamp
        ));
        if ptr.is_null() {
            return Err(Error::FrameAcquisition("failed to acquire frame".to_string()));
        }
        Ok(ArgusFrame {
            ptr,
            number,
            timestamp,
        })
    }

    fn create_native_buffer(
        &mut self,
        frame: &ArgusFrame,
        resolution: Resolution,
    ) -> Result<ArgusBuffer, Error> {
        if !frame.has_native_buffer()? {
            return Err(Error::FrameAcquisition(
                "frame image does not support native buffers".to_string(),
            ));
        }

        let fd: c_int = argus!(jep_frame_create_nvbuffer(
            frame.ptr,
            resolution.width,
            resolution.height
        ));
        if fd < 0 {
            return Err(Error::FrameAcquisition(format!(
                "failed to create {} native buffer",
                resolution
            )));
        }
        Ok(ArgusBuffer { fd, resolution })
    }

    fn copy_to_native_buffer(
        &mut self,
        frame: &ArgusFrame,
        buffer: &mut ArgusBuffer,
    ) -> Result<(), Error> {
        if !frame.has_native_buffer()? {
            return Err(Error::FrameAcquisition(
                "frame image does not support native buffers".to_string(),
            ));
        }

        if argus!(jep_frame_copy_to_nvbuffer(frame.ptr, buffer.fd)) != 0 {
            return Err(Error::FrameAcquisition(format!(
                "failed to copy frame {} into native buffer fd:{}",
                frame.number, buffer.fd
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ControlSettings;
    use serial_test::serial;

    #[test]
    fn test_request_to_ffi_defaults() {
        let request = CaptureRequest {
            sensor_mode: 2,
            frame_duration_ns: 33_333_333,
            controls: ControlSettings {
                gain: ValueRange::new(1.0, 16.0),
                ..Default::default()
            },
        };
        let req = request_to_ffi(&request);
        assert_eq!(req.sensor_mode, 2);
        assert_eq!(req.frame_duration_ns, 33_333_333);
        assert_eq!(req.gain.max, 16.0);
        assert_eq!(req.optical_black_enable, 0);
        assert_eq!(req.denoise_mode, ffi::JEP_DENOISE_DEFAULT);
        assert_eq!(req.denoise_strength_enable, 0);
    }

    #[test]
    fn test_request_to_ffi_overrides() {
        let request = CaptureRequest {
            sensor_mode: 0,
            frame_duration_ns: 16_666_667,
            controls: ControlSettings {
                optical_black: Some(OpticalBlack {
                    r: 0.1,
                    g_even: 0.2,
                    g_odd: 0.3,
                    b: 0.4,
                }),
                denoise_mode: Some(DenoiseMode::HighQuality),
                denoise_strength: Some(0.5),
                ..Default::default()
            },
        };
        let req = request_to_ffi(&request);
        assert_eq!(req.optical_black_enable, 1);
        assert_eq!(req.optical_black, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(req.denoise_mode, ffi::JEP_DENOISE_HIGH_QUALITY);
        assert_eq!(req.denoise_strength_enable, 1);
        assert_eq!(req.denoise_strength, 0.5);
    }

    #[ignore = "test requires jetson camera hardware (run with --include-ignored to enable)"]
    #[test]
    #[serial]
    fn test_enumerate() -> Result<(), Error> {
        let mut backend = ArgusBackend::new()?;
        println!("{}", backend.version());

        let sensors = backend.enumerate_sensors()?;
        assert!(!sensors.is_empty());
        for sensor in &sensors {
            let modes = backend.sensor_modes(sensor)?;
            for mode in &modes {
                println!("device {} {} max fps {:.1}", sensor.device(), mode, mode.max_fps());
            }
            assert!(!modes.is_empty());
        }

        Ok(())
    }

    #[ignore = "test requires jetson camera hardware (run with --include-ignored to enable)"]
    #[test]
    #[serial]
    fn test_native_buffer() -> Result<(), Error> {
        let mut backend = ArgusBackend::new()?;
        let sensors = backend.enumerate_sensors()?;
        let sensor = sensors[0];
        let modes = backend.sensor_modes(&sensor)?;
        let resolution = Resolution::new(1920, 1080);

        let mut session = backend.create_session(&[sensor])?;
        let mut stream =
            backend.create_stream(&mut session, &sensor, &StreamTemplate::new(resolution))?;
        let mut consumer = backend.create_consumer(&mut stream)?;
        let defaults = backend.control_defaults(&mut session, &sensor, &modes[0])?;
        let request = CaptureRequest {
            sensor_mode: 0,
            frame_duration_ns: modes[0].min_frame_duration_ns,
            controls: defaults.into(),
        };
        backend.start_repeat(&mut session, &request, &[&stream])?;

        let frame = backend.acquire_frame(&mut consumer)?;
        let mut buffer = backend.create_native_buffer(&frame, resolution)?;
        let fd = buffer.rawfd();
        drop(frame);

        let frame = backend.acquire_frame(&mut consumer)?;
        backend.copy_to_native_buffer(&frame, &mut buffer)?;
        assert_eq!(buffer.rawfd(), fd);
        println!("{} frame {}", buffer, frame.number());

        let mapped = buffer.dmabuf()?.memory_map()?;
        let len = mapped
            .read(|bytes, _: Option<()>| Ok(bytes.len()), None)
            .map_err(|e| Error::FrameAcquisition(format!("DMA read error: {}", e)))?;
        assert!(len >= resolution.width as usize * resolution.height as usize);

        let mut image = Yuv420Image::new(resolution);
        buffer.read_yuv420(&mut image)?;
        drop(frame);

        backend.stop_repeat(&mut session)?;
        backend.wait_for_idle(&mut session)?;
        backend.disconnect_stream(&mut stream)?;

        Ok(())
    }
}
