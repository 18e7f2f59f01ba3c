// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Settings overlay
//!
//! Optional overrides written into the shared capture request once, at
//! session construction. Range overrides may only narrow the automatic
//! control ranges reported by the hardware:
//!
//! | Key | Effect | Validated against |
//! |-----|--------|-------------------|
//! | `min_auto_isp_gain` / `max_auto_isp_gain` | ISP digital gain range | reported ISP gain range |
//! | `min_gain` / `max_gain` | analog sensor gain range | reported gain range |
//! | `min_exposure_time` / `max_exposure_time` | exposure time range (ns) | reported exposure range |
//! | `optical_black_r` / `_b` / `_g_even` / `_g_odd` | black level offsets, enables correction | - |
//! | `denoise` | 0 = off, 1 = fast, 2 = high quality | enum only |
//! | `denoise_strength` | noise reduction strength | - |
//!
//! Both ends of a range are checked against the range the hardware
//! originally reported, never against a sibling override from the same
//! overlay.

use crate::{
    backend::{ControlDefaults, ControlSettings, DenoiseMode, OpticalBlack, ValueRange},
    Error,
};
use serde::{Deserialize, Serialize};

/// Sparse set of control overrides. Unset fields keep the hardware value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverlay {
    pub min_auto_isp_gain: Option<f64>,
    pub max_auto_isp_gain: Option<f64>,
    pub min_gain: Option<f64>,
    pub max_gain: Option<f64>,
    pub min_exposure_time: Option<f64>,
    pub max_exposure_time: Option<f64>,
    pub optical_black_r: Option<f64>,
    pub optical_black_b: Option<f64>,
    pub optical_black_g_even: Option<f64>,
    pub optical_black_g_odd: Option<f64>,
    pub denoise: Option<f64>,
    pub denoise_strength: Option<f64>,
}

impl SettingsOverlay {
    /// Every key the overlay understands.
    pub const KEYS: [&'static str; 12] = [
        "min_auto_isp_gain",
        "max_auto_isp_gain",
        "min_gain",
        "max_gain",
        "min_exposure_time",
        "max_exposure_time",
        "optical_black_r",
        "optical_black_b",
        "optical_black_g_even",
        "optical_black_g_odd",
        "denoise",
        "denoise_strength",
    ];

    /// Builds an overlay from name/value pairs. Unknown names are logged and
    /// ignored; a repeated name keeps the last value.
    ///
    /// # Example
    ///
    /// ```
    /// use jepture::settings::SettingsOverlay;
    ///
    /// let overlay = SettingsOverlay::from_pairs([("min_gain", 2.0), ("max_gain", 8.0)]);
    /// assert_eq!(overlay.min_gain, Some(2.0));
    /// assert_eq!(overlay.max_gain, Some(8.0));
    /// ```
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut overlay = SettingsOverlay::default();
        for (key, value) in pairs {
            if !overlay.set(key.as_ref(), value) {
                log::warn!("ignoring unknown setting \"{}\"", key.as_ref());
            }
        }
        overlay
    }

    /// Sets one field by name, returns false for an unknown name.
    pub fn set(&mut self, key: &str, value: f64) -> bool {
        let field = match key {
            "min_auto_isp_gain" => &mut self.min_auto_isp_gain,
            "max_auto_isp_gain" => &mut self.max_auto_isp_gain,
            "min_gain" => &mut self.min_gain,
            "max_gain" => &mut self.max_gain,
            "min_exposure_time" => &mut self.min_exposure_time,
            "max_exposure_time" => &mut self.max_exposure_time,
            "optical_black_r" => &mut self.optical_black_r,
            "optical_black_b" => &mut self.optical_black_b,
            "optical_black_g_even" => &mut self.optical_black_g_even,
            "optical_black_g_odd" => &mut self.optical_black_g_odd,
            "denoise" => &mut self.denoise,
            "denoise_strength" => &mut self.denoise_strength,
            _ => return false,
        };
        *field = Some(value);
        true
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsOverlay::default()
    }

    /// Produces the request controls for `defaults` with this overlay applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSettingValue`] for the first range override
    /// outside the range reported in `defaults`.
    pub fn apply(&self, defaults: &ControlDefaults) -> Result<ControlSettings, Error> {
        let mut controls = ControlSettings::from(*defaults);

        controls.isp_digital_gain = narrow(
            defaults.isp_digital_gain,
            ("min_auto_isp_gain", self.min_auto_isp_gain),
            ("max_auto_isp_gain", self.max_auto_isp_gain),
        )?;
        controls.gain = narrow(
            defaults.gain,
            ("min_gain", self.min_gain),
            ("max_gain", self.max_gain),
        )?;
        controls.exposure_time = narrow(
            defaults.exposure_time,
            ("min_exposure_time", self.min_exposure_time),
            ("max_exposure_time", self.max_exposure_time),
        )?;

        let black_levels = [
            self.optical_black_r,
            self.optical_black_b,
            self.optical_black_g_even,
            self.optical_black_g_odd,
        ];
        if black_levels.iter().any(Option::is_some) {
            let base = defaults.optical_black;
            controls.optical_black = Some(OpticalBlack {
                r: self.optical_black_r.map_or(base.r, |v| v as f32),
                b: self.optical_black_b.map_or(base.b, |v| v as f32),
                g_even: self.optical_black_g_even.map_or(base.g_even, |v| v as f32),
                g_odd: self.optical_black_g_odd.map_or(base.g_odd, |v| v as f32),
            });
            log::debug!("optical black enabled: {:?}", controls.optical_black);
        }

        if let Some(value) = self.denoise {
            match DenoiseMode::from_value(value) {
                Some(mode) => controls.denoise_mode = Some(mode),
                None => log::warn!(
                    "ignoring denoise value {}, expected 0 (off), 1 (fast) or 2 (high quality)",
                    value
                ),
            }
        }
        controls.denoise_strength = self.denoise_strength;

        Ok(controls)
    }
}

/// Narrows `original` by the optional min and max overrides, each checked
/// against `original` alone.
fn narrow(
    original: ValueRange,
    (min_key, min): (&'static str, Option<f64>),
    (max_key, max): (&'static str, Option<f64>),
) -> Result<ValueRange, Error> {
    let mut range = original;
    if let Some(value) = min {
        range.min = checked(original, min_key, value)?;
    }
    if let Some(value) = max {
        range.max = checked(original, max_key, value)?;
    }
    if range != original {
        log::debug!("{}/{} narrowed {} to {}", min_key, max_key, original, range);
    }
    Ok(range)
}

fn checked(original: ValueRange, option: &'static str, value: f64) -> Result<f64, Error> {
    if original.contains(value) {
        Ok(value)
    } else {
        Err(Error::InvalidSettingValue {
            option,
            value,
            valid_range: original,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ControlDefaults {
        ControlDefaults {
            isp_digital_gain: ValueRange::new(1.0, 256.0),
            gain: ValueRange::new(1.0, 16.0),
            exposure_time: ValueRange::new(30_000.0, 660_000_000.0),
            optical_black: OpticalBlack {
                r: 0.0625,
                g_even: 0.0625,
                g_odd: 0.0625,
                b: 0.0625,
            },
        }
    }

    #[test]
    fn test_empty_overlay_keeps_defaults() {
        let overlay = SettingsOverlay::default();
        assert!(overlay.is_empty());
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls, ControlSettings::from(defaults()));
    }

    #[test]
    fn test_gain_narrows() {
        let overlay = SettingsOverlay::from_pairs([("min_gain", 2.0), ("max_gain", 8.0)]);
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls.gain, ValueRange::new(2.0, 8.0));
        assert_eq!(controls.isp_digital_gain, defaults().isp_digital_gain);
    }

    #[test]
    fn test_gain_below_hardware_range() {
        let overlay = SettingsOverlay::from_pairs([("min_gain", 0.5)]);
        match overlay.apply(&defaults()).unwrap_err() {
            Error::InvalidSettingValue {
                option,
                value,
                valid_range,
            } => {
                assert_eq!(option, "min_gain");
                assert_eq!(value, 0.5);
                assert_eq!(valid_range, ValueRange::new(1.0, 16.0));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_max_checked_against_original_not_narrowed_range() {
        // max below the new min is still within the original range.
        let overlay = SettingsOverlay::from_pairs([("min_gain", 10.0), ("max_gain", 4.0)]);
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls.gain, ValueRange::new(10.0, 4.0));
    }

    #[test]
    fn test_max_above_hardware_range() {
        let overlay = SettingsOverlay::from_pairs([("max_exposure_time", 1e9)]);
        let err = overlay.apply(&defaults()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSettingValue {
                option: "max_exposure_time",
                ..
            }
        ));
    }

    #[test]
    fn test_isp_gain_bounds_inclusive() {
        let overlay =
            SettingsOverlay::from_pairs([("min_auto_isp_gain", 1.0), ("max_auto_isp_gain", 256.0)]);
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls.isp_digital_gain, ValueRange::new(1.0, 256.0));
    }

    #[test]
    fn test_nan_rejected() {
        let overlay = SettingsOverlay::from_pairs([("min_exposure_time", f64::NAN)]);
        assert!(overlay.apply(&defaults()).is_err());
    }

    #[test]
    fn test_single_optical_black_writes_all_channels() {
        let overlay = SettingsOverlay::from_pairs([("optical_black_r", 0.25)]);
        let controls = overlay.apply(&defaults()).unwrap();
        let black = controls.optical_black.unwrap();
        assert_eq!(black.r, 0.25);
        assert_eq!(black.b, 0.0625);
        assert_eq!(black.g_even, 0.0625);
        assert_eq!(black.g_odd, 0.0625);
    }

    #[test]
    fn test_optical_black_is_raw_pass_through() {
        let overlay = SettingsOverlay::from_pairs([("optical_black_g_odd", 42.0)]);
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls.optical_black.unwrap().g_odd, 42.0);
    }

    #[test]
    fn test_denoise_modes() {
        for (value, mode) in [
            (0.0, DenoiseMode::Off),
            (1.0, DenoiseMode::Fast),
            (2.0, DenoiseMode::HighQuality),
        ] {
            let overlay = SettingsOverlay::from_pairs([("denoise", value)]);
            assert_eq!(overlay.apply(&defaults()).unwrap().denoise_mode, Some(mode));
        }
    }

    #[test]
    fn test_invalid_denoise_is_ignored() {
        let overlay = SettingsOverlay::from_pairs([("denoise", 3.0), ("denoise_strength", 0.7)]);
        let controls = overlay.apply(&defaults()).unwrap();
        assert_eq!(controls.denoise_mode, None);
        assert_eq!(controls.denoise_strength, Some(0.7));
    }

    #[test]
    fn test_unknown_key_ignored() {
        let overlay = SettingsOverlay::from_pairs([("white_balance", 1.0)]);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_every_key_is_settable() {
        let mut overlay = SettingsOverlay::default();
        for key in SettingsOverlay::KEYS {
            assert!(overlay.set(key, 1.0), "key {} rejected", key);
        }
        assert!(!overlay.is_empty());
    }

    #[test]
    fn test_from_owned_strings() {
        let pairs = vec![("denoise".to_string(), 2.0)];
        let overlay = SettingsOverlay::from_pairs(pairs);
        assert_eq!(overlay.denoise, Some(2.0));
    }
}
