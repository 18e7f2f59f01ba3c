// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Sensor mode negotiation
//!
//! Every camera of a session must run the same sensor mode. A mode is picked
//! per camera, either explicitly or by searching the hardware mode table for
//! the first mode whose frame duration interval contains the target frame
//! period. The per-camera choices must then agree.

use crate::{config::Resolution, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SECOND: f64 = 1e9;

/// A hardware capture configuration of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorModeDescriptor {
    /// Position of the mode in the sensor's mode table.
    pub index: u32,
    pub min_frame_duration_ns: u64,
    pub max_frame_duration_ns: u64,
    pub resolution: Resolution,
}

impl SensorModeDescriptor {
    /// Highest frame rate the mode supports.
    pub fn max_fps(&self) -> f64 {
        if self.min_frame_duration_ns == 0 {
            return f64::INFINITY;
        }
        NANOS_PER_SECOND / self.min_frame_duration_ns as f64
    }

    /// Returns true when `period_ns` lies within the frame duration interval,
    /// both ends inclusive.
    pub fn supports_period(&self, period_ns: u64) -> bool {
        self.min_frame_duration_ns <= period_ns && period_ns <= self.max_frame_duration_ns
    }
}

impl fmt::Display for SensorModeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode {} {} [{}, {}] ns",
            self.index, self.resolution, self.min_frame_duration_ns, self.max_frame_duration_ns
        )
    }
}

/// Frame period searched for when selecting a mode, rounded up.
pub fn target_period_ns(fps: f32) -> u64 {
    (NANOS_PER_SECOND / fps as f64).ceil() as u64
}

/// Fixed frame duration written into the capture request, rounded to nearest.
pub fn frame_duration_ns(fps: f32) -> u64 {
    (NANOS_PER_SECOND / fps as f64).round() as u64
}

/// Returns the position of the first mode supporting `fps`.
///
/// # Errors
///
/// Returns [`Error::NoSensorMode`] if `modes` is empty or no mode interval
/// contains the target period.
pub fn select_mode(camera: &str, modes: &[SensorModeDescriptor], fps: f32) -> Result<u32, Error> {
    let period = target_period_ns(fps);
    let no_mode = || Error::NoSensorMode {
        camera: camera.to_owned(),
        target_period_ns: period,
        modes: modes.len(),
    };

    for (position, mode) in modes.iter().enumerate() {
        log::debug!(
            "camera \"{}\" sensor mode[{}] fps: {:.3} resolution: {}",
            camera,
            position,
            mode.max_fps(),
            mode.resolution
        );
        if mode.supports_period(period) {
            log::debug!("camera \"{}\" selected mode: {}", camera, position);
            return u32::try_from(position).map_err(|_| no_mode());
        }
    }

    Err(no_mode())
}

/// Where a camera's mode index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChoice {
    /// Requested for this camera only.
    Camera(u32),
    /// Requested for the whole session.
    Session(u32),
    /// Found by the frame rate search.
    Searched(u32),
}

impl ModeChoice {
    pub fn index(&self) -> u32 {
        match self {
            ModeChoice::Camera(index) | ModeChoice::Session(index) | ModeChoice::Searched(index) => {
                *index
            }
        }
    }
}

/// Picks the mode of one camera: its own explicit mode, else the session
/// mode, else the frame rate search. Explicit indices are not checked here.
pub fn resolve_mode(
    camera: &str,
    modes: &[SensorModeDescriptor],
    fps: f32,
    camera_mode: Option<u32>,
    session_mode: Option<u32>,
) -> Result<ModeChoice, Error> {
    if let Some(index) = camera_mode {
        return Ok(ModeChoice::Camera(index));
    }
    if let Some(index) = session_mode {
        return Ok(ModeChoice::Session(index));
    }
    select_mode(camera, modes, fps).map(ModeChoice::Searched)
}

/// Requires every camera to have resolved the same mode index.
///
/// # Errors
///
/// Returns [`Error::Session`] naming the first disagreeing index, regardless
/// of whether either index exists.
pub fn agree(choices: &[ModeChoice]) -> Result<u32, Error> {
    let first = match choices.first() {
        Some(choice) => choice.index(),
        None => return Err(Error::Session("no cameras to negotiate a sensor mode for".into())),
    };

    if let Some(other) = choices.iter().find(|choice| choice.index() != first) {
        return Err(Error::Session(format!(
            "cameras can not agree on a sensor mode: {} vs {}",
            first,
            other.index()
        )));
    }

    Ok(first)
}

/// Looks up the agreed mode in one camera's mode table.
///
/// # Errors
///
/// Returns [`Error::UnknownSensorMode`] if the camera has no mode at `index`.
pub fn mode_at<'a>(
    camera: &str,
    modes: &'a [SensorModeDescriptor],
    index: u32,
) -> Result<&'a SensorModeDescriptor, Error> {
    modes
        .get(index as usize)
        .ok_or_else(|| Error::UnknownSensorMode {
            camera: camera.to_owned(),
            index,
            modes: modes.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(index: u32, min: u64, max: u64) -> SensorModeDescriptor {
        SensorModeDescriptor {
            index,
            min_frame_duration_ns: min,
            max_frame_duration_ns: max,
            resolution: Resolution::new(1920, 1080),
        }
    }

    #[test]
    fn test_period_rounding() {
        assert_eq!(target_period_ns(30.0), 33_333_334);
        assert_eq!(frame_duration_ns(30.0), 33_333_333);
        assert_eq!(target_period_ns(60.0), 16_666_667);
        assert_eq!(frame_duration_ns(60.0), 16_666_667);
        assert_eq!(target_period_ns(25.0), 40_000_000);
        assert_eq!(frame_duration_ns(25.0), 40_000_000);
    }

    #[test]
    fn test_select_wide_interval() {
        let modes = [mode(0, 16_000_000, 40_000_000)];
        assert_eq!(select_mode("cam", &modes, 30.0).unwrap(), 0);
    }

    #[test]
    fn test_select_exact_duration_misses() {
        let modes = [mode(0, 33_000_000, 33_000_000)];
        let err = select_mode("cam", &modes, 30.0).unwrap_err();
        assert!(matches!(err, Error::NoSensorMode { modes: 1, .. }));
    }

    #[test]
    fn test_select_first_match_wins() {
        let modes = [
            mode(0, 8_000_000, 16_000_000),
            mode(1, 16_000_000, 40_000_000),
            mode(2, 10_000_000, 100_000_000),
        ];
        assert_eq!(select_mode("cam", &modes, 30.0).unwrap(), 1);
        assert_eq!(select_mode("cam", &modes, 120.0).unwrap(), 0);
    }

    #[test]
    fn test_select_inclusive_endpoints() {
        let modes = [mode(0, 40_000_000, 50_000_000)];
        assert_eq!(select_mode("cam", &modes, 25.0).unwrap(), 0);
        let modes = [mode(0, 10_000_000, 40_000_000)];
        assert_eq!(select_mode("cam", &modes, 25.0).unwrap(), 0);
    }

    #[test]
    fn test_select_empty() {
        let err = select_mode("cam", &[], 30.0).unwrap_err();
        assert!(matches!(err, Error::NoSensorMode { modes: 0, .. }));
    }

    #[test]
    fn test_resolve_precedence() {
        let modes = [mode(0, 16_000_000, 40_000_000)];
        assert_eq!(
            resolve_mode("cam", &modes, 30.0, Some(4), Some(2)).unwrap(),
            ModeChoice::Camera(4)
        );
        assert_eq!(
            resolve_mode("cam", &modes, 30.0, None, Some(2)).unwrap(),
            ModeChoice::Session(2)
        );
        assert_eq!(
            resolve_mode("cam", &modes, 30.0, None, None).unwrap(),
            ModeChoice::Searched(0)
        );
    }

    #[test]
    fn test_explicit_mode_skips_search() {
        // No mode supports 30 fps, but an explicit index bypasses the search.
        let modes = [mode(0, 1_000_000, 2_000_000)];
        assert_eq!(
            resolve_mode("cam", &modes, 30.0, None, Some(0)).unwrap(),
            ModeChoice::Session(0)
        );
    }

    #[test]
    fn test_agree() {
        let choices = [ModeChoice::Searched(1), ModeChoice::Session(1)];
        assert_eq!(agree(&choices).unwrap(), 1);
    }

    #[test]
    fn test_disagree_regardless_of_validity() {
        let choices = [ModeChoice::Camera(0), ModeChoice::Camera(99)];
        let err = agree(&choices).unwrap_err();
        match err {
            Error::Session(msg) => assert!(msg.contains("0 vs 99")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_mode_at_out_of_range() {
        let modes = [mode(0, 16_000_000, 40_000_000)];
        assert!(mode_at("cam", &modes, 0).is_ok());
        let err = mode_at("cam", &modes, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownSensorMode {
                index: 5,
                modes: 1,
                ..
            }
        ));
        assert!(err.to_string().contains("sensor mode 5"));
    }

    #[test]
    fn test_max_fps() {
        assert_eq!(mode(0, 16_666_667, 40_000_000).max_fps().round(), 60.0);
        assert!(mode(0, 0, 1).max_fps().is_infinite());
    }
}
