// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Capture backend abstraction
//!
//! The session, negotiation and overlay logic never talks to hardware
//! directly. It drives a [`CaptureBackend`], which owns the handful of
//! capabilities a capture stack has to provide:
//!
//! | Capability | Method |
//! |------------|--------|
//! | Sensor discovery | [`CaptureBackend::enumerate_sensors`], [`CaptureBackend::sensor_modes`] |
//! | Session setup | [`CaptureBackend::create_session`], [`CaptureBackend::create_stream`], [`CaptureBackend::create_consumer`] |
//! | Request control | [`CaptureBackend::control_defaults`], [`CaptureBackend::start_repeat`], [`CaptureBackend::stop_repeat`], [`CaptureBackend::wait_for_idle`] |
//! | Frame delivery | [`CaptureBackend::acquire_frame`], [`CaptureBackend::create_native_buffer`], [`CaptureBackend::copy_to_native_buffer`] |
//!
//! Two implementations ship with the crate:
//!
//! - [`argus::ArgusBackend`] drives the camera hardware through the capture
//!   shim loaded by `jepture-sys`.
//! - [`synthetic::SyntheticBackend`] fabricates sensors and frames in memory.
//!
//! Handles returned by a backend release their resources when dropped, so a
//! partially built session cleans up simply by going out of scope.

use crate::{config::Resolution, mode::SensorModeDescriptor, yuv::Yuv420Image, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod argus;
pub mod synthetic;

/// Closed interval of a hardware control value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        ValueRange { min, max }
    }

    /// A degenerate range holding a single value.
    pub fn point(value: f64) -> Self {
        ValueRange {
            min: value,
            max: value,
        }
    }

    /// Returns true when `value` lies within the range, both ends inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// The values both ranges contain, `None` if they do not overlap.
    pub fn intersect(&self, other: &ValueRange) -> Option<ValueRange> {
        let range = ValueRange::new(self.min.max(other.min), self.max.min(other.max));
        (range.min <= range.max).then_some(range)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Pixel formats a stream can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4:2:0 chroma subsampled planar YCbCr
    YCbCr420,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::YCbCr420 => write!(f, "YCbCr_420_888"),
        }
    }
}

/// Output stream settings shared by every camera of a session.
///
/// Streams are bound to the default display surface of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTemplate {
    pub pixel_format: PixelFormat,
    pub resolution: Resolution,
}

impl StreamTemplate {
    pub fn new(resolution: Resolution) -> Self {
        StreamTemplate {
            pixel_format: PixelFormat::YCbCr420,
            resolution,
        }
    }
}

/// Per-channel optical black level offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpticalBlack {
    pub r: f32,
    pub g_even: f32,
    pub g_odd: f32,
    pub b: f32,
}

/// Noise reduction modes of the image signal processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenoiseMode {
    Off,
    Fast,
    HighQuality,
}

impl DenoiseMode {
    /// Maps the numeric settings value (0, 1, 2) to a mode.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(DenoiseMode::Off)
        } else if value == 1.0 {
            Some(DenoiseMode::Fast)
        } else if value == 2.0 {
            Some(DenoiseMode::HighQuality)
        } else {
            None
        }
    }
}

/// Control values the hardware reports for a sensor mode before any
/// override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlDefaults {
    pub isp_digital_gain: ValueRange,
    pub gain: ValueRange,
    /// Exposure time range in nanoseconds
    pub exposure_time: ValueRange,
    pub optical_black: OpticalBlack,
}

impl ControlDefaults {
    /// Narrows every range to the values both cameras support. Optical black
    /// levels are kept from `self`.
    pub fn intersect(&self, other: &ControlDefaults) -> Option<ControlDefaults> {
        Some(ControlDefaults {
            isp_digital_gain: self.isp_digital_gain.intersect(&other.isp_digital_gain)?,
            gain: self.gain.intersect(&other.gain)?,
            exposure_time: self.exposure_time.intersect(&other.exposure_time)?,
            optical_black: self.optical_black,
        })
    }
}

/// Control section of the shared capture request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlSettings {
    pub isp_digital_gain: ValueRange,
    pub gain: ValueRange,
    /// Exposure time range in nanoseconds
    pub exposure_time: ValueRange,
    /// Optical black correction, `None` leaves it disabled.
    pub optical_black: Option<OpticalBlack>,
    /// `None` keeps the hardware default mode.
    pub denoise_mode: Option<DenoiseMode>,
    /// `None` keeps the hardware default strength.
    pub denoise_strength: Option<f64>,
}

impl From<ControlDefaults> for ControlSettings {
    fn from(defaults: ControlDefaults) -> Self {
        ControlSettings {
            isp_digital_gain: defaults.isp_digital_gain,
            gain: defaults.gain,
            exposure_time: defaults.exposure_time,
            optical_black: None,
            denoise_mode: None,
            denoise_strength: None,
        }
    }
}

/// The single repeating request shared by every camera of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    pub sensor_mode: u32,
    /// Fixed frame duration in nanoseconds, pinning the capture rate.
    pub frame_duration_ns: u64,
    pub controls: ControlSettings,
}

/// Per-frame metadata read from an acquired frame.
pub trait CapturedFrame {
    /// Hardware frame sequence number.
    fn number(&self) -> u64;

    /// Capture timestamp in backend clock units.
    fn timestamp(&self) -> u64;
}

/// A persistent native image buffer owned by one camera stream.
///
/// Dropping the buffer releases the underlying memory.
pub trait NativeBuffer {
    /// Backend handle identifying the buffer, a DMA file descriptor on
    /// hardware. Stable for the lifetime of the buffer.
    fn handle(&self) -> i32;

    fn resolution(&self) -> Resolution;

    /// Copies the current contents into `dst` as tightly packed planar
    /// 4:2:0. `dst` must match [`NativeBuffer::resolution`].
    fn read_yuv420(&self, dst: &mut Yuv420Image) -> Result<(), Error>;
}

/// Hardware capture capabilities required by a capture session.
pub trait CaptureBackend {
    /// Physical sensor handle.
    type Sensor;
    type Session;
    type Stream;
    type Consumer;
    type Frame: CapturedFrame;
    type Buffer: NativeBuffer;

    /// Human readable backend name and version.
    fn version(&self) -> String;

    /// Lists every physical sensor, in hardware order.
    fn enumerate_sensors(&mut self) -> Result<Vec<Self::Sensor>, Error>;

    /// Lists the basic sensor modes of `sensor`, in hardware order.
    fn sensor_modes(&mut self, sensor: &Self::Sensor) -> Result<Vec<SensorModeDescriptor>, Error>;

    /// Creates one session spanning all `sensors`.
    fn create_session(&mut self, sensors: &[Self::Sensor]) -> Result<Self::Session, Error>;

    fn create_stream(
        &mut self,
        session: &mut Self::Session,
        sensor: &Self::Sensor,
        template: &StreamTemplate,
    ) -> Result<Self::Stream, Error>;

    fn create_consumer(&mut self, stream: &mut Self::Stream) -> Result<Self::Consumer, Error>;

    /// Reports the control ranges of `sensor` operating in `mode`.
    fn control_defaults(
        &mut self,
        session: &mut Self::Session,
        sensor: &Self::Sensor,
        mode: &SensorModeDescriptor,
    ) -> Result<ControlDefaults, Error>;

    /// Submits `request` as the repeating request with every stream enabled.
    fn start_repeat(
        &mut self,
        session: &mut Self::Session,
        request: &CaptureRequest,
        streams: &[&Self::Stream],
    ) -> Result<(), Error>;

    fn stop_repeat(&mut self, session: &mut Self::Session) -> Result<(), Error>;

    /// Blocks until the session has no requests in flight.
    fn wait_for_idle(&mut self, session: &mut Self::Session) -> Result<(), Error>;

    fn disconnect_stream(&mut self, stream: &mut Self::Stream) -> Result<(), Error>;

    /// Blocks until the consumer has a frame available.
    fn acquire_frame(&mut self, consumer: &mut Self::Consumer) -> Result<Self::Frame, Error>;

    /// Allocates a persistent buffer of `resolution` filled with the image of
    /// `frame`.
    fn create_native_buffer(
        &mut self,
        frame: &Self::Frame,
        resolution: Resolution,
    ) -> Result<Self::Buffer, Error>;

    /// Overwrites `buffer` in place with the image of `frame`.
    fn copy_to_native_buffer(
        &mut self,
        frame: &Self::Frame,
        buffer: &mut Self::Buffer,
    ) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_inclusive() {
        let range = ValueRange::new(1.0, 16.0);
        assert!(range.contains(1.0));
        assert!(range.contains(16.0));
        assert!(range.contains(8.0));
        assert!(!range.contains(0.5));
        assert!(!range.contains(16.5));
    }

    #[test]
    fn test_range_point() {
        let range = ValueRange::point(33_333_333.0);
        assert_eq!(range.min, range.max);
        assert!(range.contains(33_333_333.0));
    }

    #[test]
    fn test_range_intersect() {
        let wide = ValueRange::new(1.0, 16.0);
        assert_eq!(
            wide.intersect(&ValueRange::new(2.0, 4.0)),
            Some(ValueRange::new(2.0, 4.0))
        );
        assert_eq!(
            wide.intersect(&ValueRange::new(16.0, 32.0)),
            Some(ValueRange::point(16.0))
        );
        assert_eq!(wide.intersect(&ValueRange::new(17.0, 32.0)), None);
    }

    #[test]
    fn test_denoise_from_value() {
        assert_eq!(DenoiseMode::from_value(0.0), Some(DenoiseMode::Off));
        assert_eq!(DenoiseMode::from_value(1.0), Some(DenoiseMode::Fast));
        assert_eq!(DenoiseMode::from_value(2.0), Some(DenoiseMode::HighQuality));
        assert_eq!(DenoiseMode::from_value(3.0), None);
        assert_eq!(DenoiseMode::from_value(1.5), None);
        assert_eq!(DenoiseMode::from_value(-1.0), None);
    }

    #[test]
    fn test_controls_from_defaults() {
        let defaults = ControlDefaults {
            isp_digital_gain: ValueRange::new(1.0, 256.0),
            gain: ValueRange::new(1.0, 16.0),
            exposure_time: ValueRange::new(30_000.0, 660_000_000.0),
            optical_black: OpticalBlack::default(),
        };
        let controls = ControlSettings::from(defaults);
        assert_eq!(controls.gain, defaults.gain);
        assert!(controls.optical_black.is_none());
        assert!(controls.denoise_mode.is_none());
        assert!(controls.denoise_strength.is_none());
    }

    #[test]
    fn test_pixel_format_display() {
        assert_eq!(PixelFormat::YCbCr420.to_string(), "YCbCr_420_888");
    }
}
