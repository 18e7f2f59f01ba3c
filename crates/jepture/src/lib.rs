// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Jepture Library for Rust
//!
//! Synchronized image capture from one or more cameras on embedded vision
//! platforms. A [`stream::CaptureStream`] owns one capture session spanning
//! every requested camera, negotiates a single sensor mode for all of them,
//! applies optional bounded control overrides, and then pumps one frame per
//! camera per call into a persistent, in-place updated native buffer.
//!
//! # Quick Start
//!
//! ```no_run
//! use jepture::backend::argus::ArgusBackend;
//! use jepture::config::{CameraRequest, CaptureConfig};
//! use jepture::stream::CaptureStream;
//!
//! let config = CaptureConfig::new(vec![
//!     CameraRequest::new(0, "left"),
//!     CameraRequest::new(1, "right"),
//! ])
//! .with_resolution(1920, 1080)
//! .with_fps(30.0);
//!
//! let mut stream = CaptureStream::open(ArgusBackend::new()?, &config)?;
//! for record in stream.next(false)? {
//!     println!("frame {} at {}", record.sequence_number, record.timestamp);
//! }
//! # Ok::<(), jepture::Error>(())
//! ```
//!
//! # Consumers
//!
//! The [`jpeg`] and [`pixels`] modules wrap the frame pump and turn each round
//! into JPEG files, JPEG byte buffers, or packed RGBA arrays.
//!
//! # Testing without hardware
//!
//! Everything above the hardware is written against the
//! [`backend::CaptureBackend`] trait. [`backend::synthetic::SyntheticBackend`]
//! fabricates sensors, sensor-mode tables and frames so sessions can be
//! exercised on any host.

use std::{error, fmt, io};

pub use backend::ValueRange;
use jepture_sys as ffi;

/// Error type for capture operations
#[derive(Debug)]
pub enum Error {
    /// The capture shim (libjepture_argus.so) could not be loaded at runtime
    LibraryNotLoaded(ffi::libloading::Error),

    /// I/O error from file system operations
    Io(io::Error),

    /// Configuration document could not be parsed
    Json(serde_json::Error),

    /// Image encoding error from a downstream consumer
    Image(image::ImageError),

    /// Invalid capture configuration: bad or duplicate camera ids, empty
    /// camera list, non-positive frame rate or resolution
    Configuration(String),

    /// Capture session, stream or request setup failed, or the cameras could
    /// not agree on a sensor mode
    Session(String),

    /// No sensor mode supports the requested frame rate
    NoSensorMode {
        /// Display name of the camera whose modes were searched
        camera: String,
        /// Frame period that was searched for
        target_period_ns: u64,
        /// Number of modes the sensor reported
        modes: usize,
    },

    /// An explicit sensor mode index past the end of a camera's mode table
    UnknownSensorMode {
        camera: String,
        index: u32,
        /// Number of modes the sensor reported
        modes: usize,
    },

    /// A settings override lies outside the hardware reported range
    InvalidSettingValue {
        option: &'static str,
        value: f64,
        valid_range: ValueRange,
    },

    /// A camera failed to deliver a frame or the frame could not be copied
    FrameAcquisition(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::LibraryNotLoaded(err) => {
                write!(f, "capture library could not be loaded: {}", err)
            }
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "configuration parse error: {}", err),
            Error::Image(err) => write!(f, "image encoding error: {}", err),
            Error::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Error::Session(msg) => write!(f, "session error: {}", msg),
            Error::NoSensorMode {
                camera,
                target_period_ns,
                modes,
            } => {
                if *modes == 0 {
                    write!(f, "camera \"{}\" reported no sensor modes", camera)
                } else {
                    write!(
                        f,
                        "none of the {} sensor modes of camera \"{}\" supports a frame duration of {} ns",
                        modes, camera, target_period_ns
                    )
                }
            }
            Error::UnknownSensorMode {
                camera,
                index,
                modes,
            } => write!(
                f,
                "camera \"{}\" has no sensor mode {}, it reports {} mode(s)",
                camera, index, modes
            ),
            Error::InvalidSettingValue {
                option,
                value,
                valid_range,
            } => write!(
                f,
                "invalid value {} for setting \"{}\", valid range is {}",
                value, option, valid_range
            ),
            Error::FrameAcquisition(msg) => write!(f, "frame acquisition error: {}", msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::LibraryNotLoaded(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Image(err) => Some(err),
            Error::Configuration(_)
            | Error::Session(_)
            | Error::NoSensorMode { .. }
            | Error::UnknownSensorMode { .. }
            | Error::InvalidSettingValue { .. }
            | Error::FrameAcquisition(_) => None,
        }
    }
}

impl From<ffi::libloading::Error> for Error {
    fn from(err: ffi::libloading::Error) -> Self {
        Error::LibraryNotLoaded(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}

/// Helper macro for modules to get the shim library reference and call functions
/// All functions must return Result<T, Error> to use this macro
#[macro_export]
macro_rules! argus {
    ($fn_name:ident($($args:expr),*)) => {
        {
            #[allow(clippy::macro_metavars_in_unsafe)]
            let result = {
                let lib = jepture_sys::init()?;
                unsafe { lib.$fn_name($($args),*) }
            };
            result
        }
    };
}

/// The backend module abstracts the hardware capture stack.
pub mod backend;

/// The config module describes what a capture session is asked to do.
pub mod config;

/// The enumerator module resolves camera requests to physical sensors.
pub mod enumerator;

/// The mode module negotiates one sensor mode across all cameras.
pub mod mode;

/// The settings module applies bounded control overrides.
pub mod settings;

/// The session module builds the capture session and per-camera streams.
pub mod session;

/// The stream module provides the frame pump.
pub mod stream;

/// The yuv module holds planar 4:2:0 images and their colour conversion.
pub mod yuv;

/// The jpeg module encodes captured rounds to JPEG files or bytes.
pub mod jpeg;

/// The pixels module converts captured rounds to packed RGBA arrays.
pub mod pixels;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_setting_display() {
        let err = Error::InvalidSettingValue {
            option: "min_gain",
            value: 0.5,
            valid_range: ValueRange::new(1.0, 16.0),
        };
        assert_eq!(
            err.to_string(),
            "invalid value 0.5 for setting \"min_gain\", valid range is [1, 16]"
        );
    }

    #[test]
    fn test_no_sensor_mode_display() {
        let err = Error::NoSensorMode {
            camera: "left".to_string(),
            target_period_ns: 33_333_334,
            modes: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("left"));
        assert!(msg.contains("33333334"));

        let empty = Error::NoSensorMode {
            camera: "right".to_string(),
            target_period_ns: 33_333_334,
            modes: 0,
        };
        assert_eq!(empty.to_string(), "camera \"right\" reported no sensor modes");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(err.source().is_some());
        assert!(Error::Session("x".into()).source().is_none());
    }
}
