// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2002
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Presentation level falls outside the device playback range
    pub const PRESENTATION_LEVEL_OUT_OF_RANGE: i32 = 2001;

    /// Device playback range is empty or not finite
    pub const INVALID_DEVICE_RANGE: i32 = 2002;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=LevelCalibrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Level calibration errors
///
/// An out-of-range presentation level is fatal to the current frequency.
/// It is never silently clamped.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Computed device level falls outside the supported playback range
    PresentationLevelOutOfRange {
        level_db: f64,
        min_db: f64,
        max_db: f64,
    },

    /// Device range is empty or not finite
    InvalidDeviceRange { min_db: f64, max_db: f64 },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::PresentationLevelOutOfRange { .. } => {
                CalibrationErrorCodes::PRESENTATION_LEVEL_OUT_OF_RANGE
            }
            CalibrationError::InvalidDeviceRange { .. } => {
                CalibrationErrorCodes::INVALID_DEVICE_RANGE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::PresentationLevelOutOfRange {
                level_db,
                min_db,
                max_db,
            } => format!(
                "Presentation level {:.2} dB outside device range [{}, {}] dB",
                level_db, min_db, max_db
            ),
            CalibrationError::InvalidDeviceRange { min_db, max_db } => {
                format!("Invalid device range [{}, {}] dB", min_db, max_db)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
