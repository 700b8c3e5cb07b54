// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 1001-1014
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Frequency has no RETSPL entry
    pub const UNSUPPORTED_FREQUENCY: i32 = 1001;

    /// Channel count outside the phase pool
    pub const INVALID_CHANNEL_COUNT: i32 = 1002;

    /// Target reversal count is zero
    pub const INVALID_REVERSAL_COUNT: i32 = 1003;

    /// Step schedule has no entries
    pub const EMPTY_STEP_SCHEDULE: i32 = 1004;

    /// Step size is zero
    pub const INVALID_STEP_SIZE: i32 = 1005;

    /// Maximum level does not exceed minimum level
    pub const INVALID_LEVEL_BOUNDS: i32 = 1006;

    /// Starting level lies outside the track bounds
    pub const STARTING_LEVEL_OUT_OF_BOUNDS: i32 = 1007;

    /// Fewer target reversals than step sizes
    pub const INSUFFICIENT_REVERSALS: i32 = 1008;

    /// Stimulus duration, sample rate or modulation is invalid
    pub const INVALID_STIMULUS_PARAMETERS: i32 = 1009;

    /// Channel routing does not match the channel count
    pub const INVALID_ROUTING: i32 = 1010;

    /// No test frequencies configured
    pub const NO_TEST_FREQUENCIES: i32 = 1011;

    /// Configuration file could not be read
    pub const UNREADABLE: i32 = 1012;

    /// Configuration file could not be parsed
    pub const MALFORMED: i32 = 1013;

    /// A track bound maps outside the device playback range
    pub const TRACK_RANGE_OUTSIDE_DEVICE: i32 = 1014;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Configuration error in {}: code={}, component=SessionConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors
///
/// All of these are detected before a trial starts and never leave
/// partially mutated state behind.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Frequency is not one of the standardized RETSPL frequencies
    UnsupportedFrequency { frequency: f64 },

    /// Channel count must lie within the phase pool (1..=9)
    InvalidChannelCount { requested: usize, max: usize },

    /// Target reversal count must be positive
    InvalidReversalCount { requested: u32 },

    /// Staircase needs at least one step size
    EmptyStepSchedule,

    /// Step sizes must be positive
    InvalidStepSize { index: usize, value: u32 },

    /// Maximum level must exceed minimum level
    InvalidLevelBounds { min_level: f64, max_level: f64 },

    /// Starting level must lie within [min_level, max_level]
    StartingLevelOutOfBounds {
        starting_level: f64,
        min_level: f64,
        max_level: f64,
    },

    /// Reversal target must at least equal the number of step sizes
    InsufficientReversals { reversals: u32, steps: usize },

    /// Stimulus synthesis parameters are invalid
    InvalidStimulusParameters { reason: String },

    /// Channel routing does not match the stimulus channel count
    InvalidRouting { reason: String },

    /// Session has no frequencies to test
    NoTestFrequencies,

    /// Configuration file could not be read
    Unreadable { path: String, reason: String },

    /// Configuration file could not be parsed
    Malformed { reason: String },

    /// Track bound whose presentation level the device cannot play
    TrackRangeOutsideDevice {
        frequency: f64,
        track_level: f64,
        level_db: f64,
        min_db: f64,
        max_db: f64,
    },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::UnsupportedFrequency { .. } => ConfigErrorCodes::UNSUPPORTED_FREQUENCY,
            ConfigError::InvalidChannelCount { .. } => ConfigErrorCodes::INVALID_CHANNEL_COUNT,
            ConfigError::InvalidReversalCount { .. } => ConfigErrorCodes::INVALID_REVERSAL_COUNT,
            ConfigError::EmptyStepSchedule => ConfigErrorCodes::EMPTY_STEP_SCHEDULE,
            ConfigError::InvalidStepSize { .. } => ConfigErrorCodes::INVALID_STEP_SIZE,
            ConfigError::InvalidLevelBounds { .. } => ConfigErrorCodes::INVALID_LEVEL_BOUNDS,
            ConfigError::StartingLevelOutOfBounds { .. } => {
                ConfigErrorCodes::STARTING_LEVEL_OUT_OF_BOUNDS
            }
            ConfigError::InsufficientReversals { .. } => ConfigErrorCodes::INSUFFICIENT_REVERSALS,
            ConfigError::InvalidStimulusParameters { .. } => {
                ConfigErrorCodes::INVALID_STIMULUS_PARAMETERS
            }
            ConfigError::InvalidRouting { .. } => ConfigErrorCodes::INVALID_ROUTING,
            ConfigError::NoTestFrequencies => ConfigErrorCodes::NO_TEST_FREQUENCIES,
            ConfigError::Unreadable { .. } => ConfigErrorCodes::UNREADABLE,
            ConfigError::Malformed { .. } => ConfigErrorCodes::MALFORMED,
            ConfigError::TrackRangeOutsideDevice { .. } => {
                ConfigErrorCodes::TRACK_RANGE_OUTSIDE_DEVICE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::UnsupportedFrequency { frequency } => {
                format!("No RETSPL value for {} Hz", frequency)
            }
            ConfigError::InvalidChannelCount { requested, max } => {
                format!(
                    "Invalid number of channels: {} (must be between 1 and {})",
                    requested, max
                )
            }
            ConfigError::InvalidReversalCount { requested } => {
                format!("Number of reversals must be positive (got {})", requested)
            }
            ConfigError::EmptyStepSchedule => "Step schedule must not be empty".to_string(),
            ConfigError::InvalidStepSize { index, value } => {
                format!("Step size {} at position {} must be positive", value, index)
            }
            ConfigError::InvalidLevelBounds {
                min_level,
                max_level,
            } => format!(
                "Maximum level {} dB must exceed minimum level {} dB",
                max_level, min_level
            ),
            ConfigError::StartingLevelOutOfBounds {
                starting_level,
                min_level,
                max_level,
            } => format!(
                "Starting level {} dB outside [{}, {}] dB",
                starting_level, min_level, max_level
            ),
            ConfigError::InsufficientReversals { reversals, steps } => format!(
                "Number of reversals ({}) must at least equal the number of steps ({})",
                reversals, steps
            ),
            ConfigError::InvalidStimulusParameters { reason } => {
                format!("Invalid stimulus parameters: {}", reason)
            }
            ConfigError::InvalidRouting { reason } => format!("Invalid routing: {}", reason),
            ConfigError::NoTestFrequencies => "No test frequencies configured".to_string(),
            ConfigError::Unreadable { path, reason } => {
                format!("Cannot read configuration {}: {}", path, reason)
            }
            ConfigError::Malformed { reason } => format!("Malformed configuration: {}", reason),
            ConfigError::TrackRangeOutsideDevice {
                frequency,
                track_level,
                level_db,
                min_db,
                max_db,
            } => format!(
                "Track level {} dB at {} Hz plays at {} dB, outside device range [{}, {}] dB",
                track_level, frequency, level_db, min_db, max_db
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
