//! Session configuration
//!
//! `SessionConfig` is an immutable value handed to the trial controller at
//! session setup. It is loaded from a JSON file owned by the settings layer
//! and validated once, before the first trial, with the same checks the
//! operator settings dialog enforces.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::calibration::{level_for, retspl, DeviceRange, SlmCalibration};
use crate::error::{log_config_error, ConfigError, SessionError};
use crate::staircase::StaircaseConfig;
use crate::stimulus::phase::MAX_CHANNELS;
use crate::stimulus::{
    StimulusParams, DEFAULT_MODULATION_DEPTH_PCT, DEFAULT_MODULATION_RATE_HZ, DEFAULT_SAMPLE_RATE,
};

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub subject: String,
    pub condition: String,
    /// Number of loudspeakers playing the stimulus (1-9)
    pub num_stim_chans: usize,
    /// Test frequencies in presentation order (Hz)
    pub test_freqs: Vec<f64>,
    /// Stimulus duration in seconds
    pub duration: f64,
    pub starting_level: f64,
    pub min_level: f64,
    pub max_level: f64,
    pub step_sizes: Vec<u32>,
    pub num_reversals: u32,
    pub rapid_descend: bool,
    pub audio_device: i32,
    /// 1-based output channel per stimulus channel
    pub channel_routing: Vec<u16>,
    pub calibration: SlmCalibration,
    pub device_range: DeviceRange,
    pub stimulus: StimulusSettings,
    pub timing: TimingConfig,
}

/// Synthesis settings shared by every frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSettings {
    pub sample_rate: u32,
    pub modulation_rate_hz: f64,
    /// Peak deviation as a percentage of the carrier
    pub modulation_depth_pct: f64,
}

impl Default for StimulusSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            modulation_rate_hz: DEFAULT_MODULATION_RATE_HZ,
            modulation_depth_pct: DEFAULT_MODULATION_DEPTH_PCT,
        }
    }
}

/// Trial timing in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Silence before interval 1
    pub pre_trial_pause_s: f64,
    /// Silent gap between the two intervals
    pub inter_stimulus_gap_s: f64,
    /// Extra hold after each interval's stimulus duration
    pub post_interval_pad_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pre_trial_pause_s: 0.5,
            inter_stimulus_gap_s: 0.5,
            post_interval_pad_s: 0.15,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            subject: "999".to_string(),
            condition: "TEST".to_string(),
            num_stim_chans: 1,
            test_freqs: vec![500.0, 1000.0, 2000.0, 4000.0],
            duration: 2.0,
            starting_level: 30.0,
            min_level: -50.0,
            max_level: 90.0,
            step_sizes: vec![10, 5, 2],
            num_reversals: 5,
            rapid_descend: true,
            audio_device: 999,
            channel_routing: vec![1],
            calibration: SlmCalibration::default(),
            device_range: DeviceRange::default(),
            stimulus: StimulusSettings::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults. Unlike a silent fallback, an
    /// unreadable or malformed file is an error: a measurement session must
    /// not start on default settings by accident.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded session configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Malformed {
            reason: err.to_string(),
        })
    }

    /// Run every pre-session check
    ///
    /// # Errors
    /// The first failing check, in the order the settings dialog reports them:
    /// channels, frequencies, reversals vs. steps, levels, step sizes, then
    /// routing, stimulus, device range and the calibrated track range.
    pub fn validate(&self) -> Result<(), SessionError> {
        self.check_all().inspect_err(|err| {
            if let SessionError::Config(config_err) = err {
                log_config_error(config_err, "SessionConfig::validate");
            }
        })
    }

    fn check_all(&self) -> Result<(), SessionError> {
        if self.num_stim_chans == 0 || self.num_stim_chans > MAX_CHANNELS {
            return Err(ConfigError::InvalidChannelCount {
                requested: self.num_stim_chans,
                max: MAX_CHANNELS,
            }
            .into());
        }

        if self.test_freqs.is_empty() {
            return Err(ConfigError::NoTestFrequencies.into());
        }
        for &frequency in &self.test_freqs {
            retspl::lookup(frequency)?;
        }

        if self.num_reversals == 0 {
            return Err(ConfigError::InvalidReversalCount {
                requested: self.num_reversals,
            }
            .into());
        }
        if (self.num_reversals as usize) < self.step_sizes.len() {
            return Err(ConfigError::InsufficientReversals {
                reversals: self.num_reversals,
                steps: self.step_sizes.len(),
            }
            .into());
        }

        self.staircase_config().validate()?;

        if self.channel_routing.len() != self.num_stim_chans {
            return Err(ConfigError::InvalidRouting {
                reason: format!(
                    "{} routing entries for {} channel(s)",
                    self.channel_routing.len(),
                    self.num_stim_chans
                ),
            }
            .into());
        }
        if self.channel_routing.contains(&0) {
            return Err(ConfigError::InvalidRouting {
                reason: "output channels are numbered from 1".to_string(),
            }
            .into());
        }

        for &frequency in &self.test_freqs {
            let params = self.stimulus_params(frequency);
            if !(params.duration_s.is_finite() && params.duration_s > 0.0)
                || params.sample_rate == 0
                || frequency >= params.sample_rate as f64 / 2.0
            {
                return Err(ConfigError::InvalidStimulusParameters {
                    reason: format!(
                        "{} Hz for {} s at {} Hz sample rate",
                        frequency, params.duration_s, params.sample_rate
                    ),
                }
                .into());
            }
        }

        self.device_range.validate()?;
        self.check_track_range()?;
        Ok(())
    }

    /// Both track bounds must calibrate into the device range at every
    /// test frequency, otherwise a track could run off the device mid-session
    fn check_track_range(&self) -> Result<(), ConfigError> {
        let offset = self.calibration.calibration_offset();
        for &frequency in &self.test_freqs {
            for track_level in [self.min_level, self.max_level] {
                let level = level_for(track_level, frequency, self.num_stim_chans, offset)?;
                if !self.device_range.contains(level.adjusted_level_db) {
                    return Err(ConfigError::TrackRangeOutsideDevice {
                        frequency,
                        track_level,
                        level_db: level.adjusted_level_db,
                        min_db: self.device_range.min_db,
                        max_db: self.device_range.max_db,
                    });
                }
            }
        }
        Ok(())
    }

    /// Staircase parameters for one frequency's track
    pub fn staircase_config(&self) -> StaircaseConfig {
        StaircaseConfig {
            starting_level: self.starting_level,
            min_level: self.min_level,
            max_level: self.max_level,
            step_sizes: self.step_sizes.clone(),
            target_reversals: self.num_reversals,
            rapid_descend: self.rapid_descend,
        }
    }

    /// Stimulus parameters for one test frequency
    pub fn stimulus_params(&self, frequency: f64) -> StimulusParams {
        StimulusParams {
            duration_s: self.duration,
            sample_rate: self.stimulus.sample_rate,
            carrier_hz: frequency,
            modulation_rate_hz: self.stimulus.modulation_rate_hz,
            modulation_depth_pct: self.stimulus.modulation_depth_pct,
            num_channels: self.num_stim_chans,
        }
    }

    /// Step sizes formatted as entered by the operator ("10, 5, 2")
    pub fn step_sizes_label(&self) -> String {
        self.step_sizes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalibrationError;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.test_freqs, vec![500.0, 1000.0, 2000.0, 4000.0]);
        assert_eq!(config.step_sizes_label(), "10, 5, 2");
        assert_eq!(config.calibration.slm_offset(), 100.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SessionConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = SessionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed =
            SessionConfig::from_json(r#"{"subject": "P1234", "test_freqs": [31.5, 8000]}"#)
                .unwrap();
        assert_eq!(parsed.subject, "P1234");
        assert_eq!(parsed.test_freqs, vec![31.5, 8000.0]);
        assert_eq!(parsed.num_reversals, 5);
        assert_eq!(parsed.timing.inter_stimulus_gap_s, 0.5);
    }

    #[test]
    fn test_malformed_json() {
        match SessionConfig::from_json("{not json") {
            Err(ConfigError::Malformed { .. }) => {}
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        match SessionConfig::load_from_file("/nonexistent/peat/session.json") {
            Err(ConfigError::Unreadable { .. }) => {}
            other => panic!("Expected Unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"num_stim_chans": 2, "channel_routing": [1, 2]}"#).unwrap();
        let config = SessionConfig::load_from_file(&path).unwrap();
        assert_eq!(config.num_stim_chans, 2);
        assert!(config.validate().is_ok());
    }

    fn expect_config_error(config: &SessionConfig) -> ConfigError {
        match config.validate() {
            Err(SessionError::Config(err)) => err,
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_channels() {
        let config = SessionConfig {
            num_stim_chans: 10,
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InvalidChannelCount { .. }
        ));
    }

    #[test]
    fn test_invalid_frequency() {
        let config = SessionConfig {
            test_freqs: vec![1000.0, 1100.0],
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::UnsupportedFrequency { .. }
        ));

        let config = SessionConfig {
            test_freqs: vec![],
            ..SessionConfig::default()
        };
        assert_eq!(expect_config_error(&config), ConfigError::NoTestFrequencies);
    }

    #[test]
    fn test_reversals_must_cover_steps() {
        let config = SessionConfig {
            num_reversals: 2,
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InsufficientReversals {
                reversals: 2,
                steps: 3
            }
        ));
    }

    #[test]
    fn test_levels_and_steps() {
        let config = SessionConfig {
            min_level: 90.0,
            max_level: 90.0,
            starting_level: 90.0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InvalidLevelBounds { .. }
        ));

        let config = SessionConfig {
            step_sizes: vec![],
            ..SessionConfig::default()
        };
        assert_eq!(expect_config_error(&config), ConfigError::EmptyStepSchedule);
    }

    #[test]
    fn test_routing_must_match_channels() {
        let config = SessionConfig {
            num_stim_chans: 3,
            channel_routing: vec![1, 2],
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InvalidRouting { .. }
        ));

        let config = SessionConfig {
            channel_routing: vec![0],
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InvalidRouting { .. }
        ));
    }

    #[test]
    fn test_invalid_duration() {
        let config = SessionConfig {
            duration: 0.0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            expect_config_error(&config),
            ConfigError::InvalidStimulusParameters { .. }
        ));
    }

    #[test]
    fn test_track_ceiling_above_device_range() {
        // 90 dB track at 16 kHz: 90 + 43.7 - 100 = 33.7 dB FS
        let config = SessionConfig {
            test_freqs: vec![1000.0, 16000.0],
            ..SessionConfig::default()
        };
        match expect_config_error(&config) {
            ConfigError::TrackRangeOutsideDevice {
                frequency,
                track_level,
                level_db,
                ..
            } => {
                assert_eq!(frequency, 16000.0);
                assert_eq!(track_level, 90.0);
                assert!((level_db - 33.7).abs() < 1e-9);
            }
            other => panic!("Expected TrackRangeOutsideDevice, got {:?}", other),
        }

        let config = SessionConfig {
            test_freqs: vec![16000.0],
            max_level: 50.0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_track_floor_below_device_range() {
        // -50 dB track at 500 Hz with 4 sources: -50 + 3.8 - 6.02 - 100
        let config = SessionConfig {
            num_stim_chans: 4,
            channel_routing: vec![1, 2, 3, 4],
            device_range: DeviceRange {
                min_db: -150.0,
                max_db: 0.0,
            },
            ..SessionConfig::default()
        };
        match expect_config_error(&config) {
            ConfigError::TrackRangeOutsideDevice {
                frequency,
                track_level,
                level_db,
                ..
            } => {
                assert_eq!(frequency, 500.0);
                assert_eq!(track_level, -50.0);
                assert!(level_db < -150.0);
            }
            other => panic!("Expected TrackRangeOutsideDevice, got {:?}", other),
        }
    }

    #[test]
    fn test_default_track_range_fits_default_device() {
        let config = SessionConfig::default();
        for channels in 1..=MAX_CHANNELS {
            let config = SessionConfig {
                num_stim_chans: channels,
                channel_routing: (1..=channels as u16).collect(),
                ..config.clone()
            };
            assert!(config.validate().is_ok(), "{} channel(s)", channels);
        }
    }

    #[test]
    fn test_invalid_device_range() {
        let config = SessionConfig {
            device_range: DeviceRange {
                min_db: 0.0,
                max_db: -10.0,
            },
            ..SessionConfig::default()
        };
        match config.validate() {
            Err(SessionError::Calibration(CalibrationError::InvalidDeviceRange { .. })) => {}
            other => panic!("Expected InvalidDeviceRange, got {:?}", other),
        }
    }
}
