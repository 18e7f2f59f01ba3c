// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{settings::SettingsOverlay, Error};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};

/// Image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }

    /// Number of pixels in one image.
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Resolution::new(width, height)
    }
}

/// One camera requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraRequest {
    /// Index of the physical sensor in hardware enumeration order.
    pub id: u32,

    /// Display name, also used as the output directory of file consumers.
    pub name: String,

    /// Explicit sensor mode for this camera, takes precedence over the
    /// session wide mode.
    #[serde(default)]
    pub sensor_mode: Option<u32>,
}

impl CameraRequest {
    pub fn new(id: u32, name: &str) -> Self {
        CameraRequest {
            id,
            name: name.to_owned(),
            sensor_mode: None,
        }
    }

    pub fn with_sensor_mode(self, mode: u32) -> Self {
        CameraRequest {
            id: self.id,
            name: self.name,
            sensor_mode: Some(mode),
        }
    }
}

fn default_resolution() -> Resolution {
    Resolution::new(1920, 1080)
}

fn default_fps() -> f32 {
    30.0
}

/// Everything a capture session is built from. Supplied once; nothing can be
/// reconfigured after the session starts.
///
/// # Example
///
/// ```
/// use jepture::config::{CameraRequest, CaptureConfig};
///
/// let config = CaptureConfig::from_json_str(
///     r#"{
///         "cameras": [{"id": 0, "name": "left"}, {"id": 1, "name": "right"}],
///         "resolution": {"width": 1280, "height": 720},
///         "fps": 60.0,
///         "settings": {"min_gain": 2.0, "max_gain": 8.0}
///     }"#,
/// )?;
/// assert_eq!(config.cameras[1], CameraRequest::new(1, "right"));
/// assert_eq!(config.fps, 60.0);
/// # Ok::<(), jepture::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Cameras in output order.
    pub cameras: Vec<CameraRequest>,

    #[serde(default = "default_resolution")]
    pub resolution: Resolution,

    /// Target frame rate, must be positive.
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Sensor mode used by every camera instead of the frame rate search.
    #[serde(default)]
    pub sensor_mode: Option<u32>,

    #[serde(default)]
    pub settings: Option<SettingsOverlay>,
}

impl CaptureConfig {
    pub fn new(cameras: Vec<CameraRequest>) -> Self {
        CaptureConfig {
            cameras,
            resolution: default_resolution(),
            fps: default_fps(),
            sensor_mode: None,
            settings: None,
        }
    }

    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        CaptureConfig {
            resolution: Resolution::new(width, height),
            ..self
        }
    }

    pub fn with_fps(self, fps: f32) -> Self {
        CaptureConfig { fps, ..self }
    }

    pub fn with_sensor_mode(self, mode: u32) -> Self {
        CaptureConfig {
            sensor_mode: Some(mode),
            ..self
        }
    }

    pub fn with_settings(self, settings: SettingsOverlay) -> Self {
        CaptureConfig {
            settings: Some(settings),
            ..self
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks everything that can be rejected without touching hardware.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cameras.is_empty() {
            return Err(Error::Configuration(
                "at least one camera must be requested".to_string(),
            ));
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(Error::Configuration(format!(
                "frame rate must be positive, got {}",
                self.fps
            )));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(Error::Configuration(format!(
                "resolution dimensions must be positive, got {}",
                self.resolution
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::new(vec![CameraRequest::new(0, "cam")]);
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert_eq!(config.fps, 30.0);
        assert!(config.sensor_mode.is_none());
        assert!(config.settings.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CaptureConfig::new(vec![CameraRequest::new(0, "cam").with_sensor_mode(2)])
            .with_resolution(640, 480)
            .with_fps(60.0)
            .with_sensor_mode(1);
        assert_eq!(config.resolution.to_string(), "640x480");
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.sensor_mode, Some(1));
        assert_eq!(config.cameras[0].sensor_mode, Some(2));
    }

    #[test]
    fn test_json_defaults_applied() {
        let config = CaptureConfig::from_json_str(r#"{"cameras": [{"id": 3, "name": "rear"}]}"#)
            .unwrap();
        assert_eq!(config.cameras, vec![CameraRequest::new(3, "rear")]);
        assert_eq!(config.resolution, Resolution::new(1920, 1080));
        assert_eq!(config.fps, 30.0);
    }

    #[test]
    fn test_json_settings() {
        let config = CaptureConfig::from_json_str(
            r#"{"cameras": [{"id": 0, "name": "a"}], "settings": {"denoise": 1.0}}"#,
        )
        .unwrap();
        assert_eq!(config.settings.unwrap().denoise, Some(1.0));
    }

    #[test]
    fn test_json_malformed() {
        let err = CaptureConfig::from_json_str("{\"cameras\": ").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_json_file_missing() {
        let err = CaptureConfig::from_json_file("/nonexistent/jepture.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_validate_rejects_empty_camera_list() {
        let err = CaptureConfig::new(Vec::new()).validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_bad_fps() {
        for fps in [0.0, -30.0, f32::NAN, f32::INFINITY] {
            let config = CaptureConfig::new(vec![CameraRequest::new(0, "cam")]).with_fps(fps);
            assert!(
                matches!(config.validate(), Err(Error::Configuration(_))),
                "fps {} accepted",
                fps
            );
        }
    }

    #[test]
    fn test_validate_rejects_empty_resolution() {
        let config = CaptureConfig::new(vec![CameraRequest::new(0, "cam")]).with_resolution(0, 480);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
