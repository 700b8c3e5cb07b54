// Level calibration pipeline
//
// Converts a staircase track level into the device playback level:
//   1. RETSPL offset for the test frequency
//   2. Incoherent (energy) summation compensation across N loudspeakers
//   3. Session calibration offset (SPL -> device dB FS)
//   4. Range check against the device playback range (never clamped)

use serde::{Deserialize, Serialize};

use crate::calibration::retspl;
use crate::error::{log_calibration_error, CalibrationError, ConfigError, SessionError};
use crate::stimulus::phase::MAX_CHANNELS;

/// Supported device playback range in dB FS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceRange {
    pub min_db: f64,
    pub max_db: f64,
}

impl Default for DeviceRange {
    fn default() -> Self {
        Self {
            min_db: -180.0,
            max_db: 0.0,
        }
    }
}

impl DeviceRange {
    pub fn new(min_db: f64, max_db: f64) -> Result<Self, CalibrationError> {
        let range = Self { min_db, max_db };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.min_db.is_finite() || !self.max_db.is_finite() || self.min_db >= self.max_db {
            return Err(CalibrationError::InvalidDeviceRange {
                min_db: self.min_db,
                max_db: self.max_db,
            });
        }
        Ok(())
    }

    pub fn contains(&self, level_db: f64) -> bool {
        level_db >= self.min_db && level_db <= self.max_db
    }
}

/// Result of calibrating one track level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentationLevel {
    /// Per-channel acoustic level after RETSPL and summation (dB SPL)
    pub desired_level_db: f64,
    /// Device playback level (dB FS)
    pub adjusted_level_db: f64,
}

/// Level reduction applied to each of `num_channels` incoherent sources so
/// their combined level equals the single-source level
pub fn summation_compensation(num_channels: usize) -> f64 {
    if num_channels <= 1 {
        0.0
    } else {
        10.0 * (num_channels as f64).log10()
    }
}

/// Round to two decimal places, ties to even
#[inline]
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Run the pipeline without the device range check
///
/// The level is monotonic in `track_level`, so checking the track bounds
/// covers every level a staircase can reach.
pub fn level_for(
    track_level: f64,
    frequency: f64,
    num_channels: usize,
    calibration_offset: f64,
) -> Result<PresentationLevel, ConfigError> {
    if num_channels == 0 || num_channels > MAX_CHANNELS {
        return Err(ConfigError::InvalidChannelCount {
            requested: num_channels,
            max: MAX_CHANNELS,
        });
    }

    let retspl_adjusted = track_level + retspl::lookup(frequency)?;
    let desired_level_db = round2(retspl_adjusted - summation_compensation(num_channels));
    Ok(PresentationLevel {
        desired_level_db,
        adjusted_level_db: desired_level_db + calibration_offset,
    })
}

/// Level calibration pipeline bound to a device playback range
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelCalibrator {
    device_range: DeviceRange,
}

impl LevelCalibrator {
    pub fn new(device_range: DeviceRange) -> Result<Self, CalibrationError> {
        device_range.validate()?;
        Ok(Self { device_range })
    }

    pub fn device_range(&self) -> DeviceRange {
        self.device_range
    }

    /// Compute the presentation level for one trial
    ///
    /// # Arguments
    /// * `track_level` - Staircase level (dB)
    /// * `frequency` - Test frequency, must have a RETSPL entry
    /// * `num_channels` - Number of loudspeakers playing the stimulus (1..=9)
    /// * `calibration_offset` - Session offset from the SLM calibration
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFrequency` / `InvalidChannelCount`
    /// * `CalibrationError::PresentationLevelOutOfRange` if the device level
    ///   falls outside the playback range
    pub fn calibrate(
        &self,
        track_level: f64,
        frequency: f64,
        num_channels: usize,
        calibration_offset: f64,
    ) -> Result<PresentationLevel, SessionError> {
        let PresentationLevel {
            desired_level_db,
            adjusted_level_db,
        } = level_for(track_level, frequency, num_channels, calibration_offset)?;

        if !self.device_range.contains(adjusted_level_db) {
            let err = CalibrationError::PresentationLevelOutOfRange {
                level_db: adjusted_level_db,
                min_db: self.device_range.min_db,
                max_db: self.device_range.max_db,
            };
            log_calibration_error(&err, "calibrate");
            return Err(err.into());
        }

        tracing::debug!(
            track_level,
            frequency,
            num_channels,
            desired_level_db,
            adjusted_level_db,
            "calibrated presentation level"
        );

        Ok(PresentationLevel {
            desired_level_db,
            adjusted_level_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_single_channel_1khz() {
        let calibrator = LevelCalibrator::default();
        let offset = -100.0;
        let level = calibrator.calibrate(30.0, 1000.0, 1, offset).unwrap();
        assert!((level.desired_level_db - 30.8).abs() < EPS);
        assert!((level.adjusted_level_db - (30.0 + 0.8 + offset)).abs() < EPS);
    }

    #[test]
    fn test_four_channels_reduced_by_6_02_db() {
        let calibrator = LevelCalibrator::default();
        let one = calibrator.calibrate(30.0, 1000.0, 1, -100.0).unwrap();
        let four = calibrator.calibrate(30.0, 1000.0, 4, -100.0).unwrap();
        let diff = one.desired_level_db - four.desired_level_db;
        assert!((diff - 6.02).abs() < 0.005, "diff was {}", diff);
        assert!((summation_compensation(4) - 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_summation_compensation_single_source_is_zero() {
        assert_eq!(summation_compensation(1), 0.0);
        assert!((summation_compensation(2) - 3.0103).abs() < 1e-4);
    }

    #[test]
    fn test_unsupported_frequency_rejected() {
        let calibrator = LevelCalibrator::default();
        match calibrator.calibrate(30.0, 1100.0, 1, -100.0) {
            Err(SessionError::Config(ConfigError::UnsupportedFrequency { .. })) => {}
            other => panic!("Expected UnsupportedFrequency, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_channel_count_rejected() {
        let calibrator = LevelCalibrator::default();
        for channels in [0, 10] {
            match calibrator.calibrate(30.0, 1000.0, channels, -100.0) {
                Err(SessionError::Config(ConfigError::InvalidChannelCount { .. })) => {}
                other => panic!("Expected InvalidChannelCount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_out_of_range_is_error_not_clamped() {
        let calibrator = LevelCalibrator::default();
        // 90 + 0.8 - 50 = 40.8 dB FS, above the 0 dB FS ceiling
        match calibrator.calibrate(90.0, 1000.0, 1, -50.0) {
            Err(SessionError::Calibration(CalibrationError::PresentationLevelOutOfRange {
                level_db,
                ..
            })) => assert!((level_db - 40.8).abs() < EPS),
            other => panic!("Expected PresentationLevelOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let calibrator = LevelCalibrator::new(DeviceRange::new(-80.0, -20.0).unwrap()).unwrap();
        // 19.2 + 0.8 - 40 = -20 exactly at the ceiling
        assert!(calibrator.calibrate(19.2, 1000.0, 1, -40.0).is_ok());
    }

    #[test]
    fn test_invalid_device_range() {
        assert!(DeviceRange::new(0.0, 0.0).is_err());
        assert!(DeviceRange::new(f64::NAN, 0.0).is_err());
        assert!(DeviceRange::new(-10.0, 0.0).is_ok());
    }

    #[test]
    fn test_level_for_skips_range_check() {
        let level = level_for(90.0, 16000.0, 1, -100.0).unwrap();
        assert!((level.adjusted_level_db - 33.7).abs() < EPS);
        assert!(LevelCalibrator::default()
            .calibrate(90.0, 16000.0, 1, -100.0)
            .is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(45.4568165), 45.46);
        assert_eq!(round2(-3.014), -3.01);
        assert_eq!(round2(42.125), 42.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-42.125), -42.12);
    }
}
