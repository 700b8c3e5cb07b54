// Presentation collaborator error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Presentation error code constants
///
/// Error code range: 4001-4004
pub struct PresentationErrorCodes {}

impl PresentationErrorCodes {
    /// Audio device id is not valid
    pub const INVALID_AUDIO_DEVICE: i32 = 4001;

    /// Speaker routing does not match the buffer channels
    pub const INVALID_ROUTING: i32 = 4002;

    /// Requested level clips the output
    pub const CLIPPING: i32 = 4003;

    /// Any other playback failure
    pub const DEVICE: i32 = 4004;
}

/// Log a presentation error with structured context
pub fn log_presentation_error(err: &PresentationError, context: &str) {
    error!(
        "Presentation error in {}: code={}, component=Presenter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors reported by the presentation collaborator
///
/// All variants are recoverable: the operator corrects the device setup and
/// the trial is presented again. Staircase state is never touched.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationError {
    /// Audio device id is not valid
    InvalidAudioDevice { device_id: i32 },

    /// Speaker routing must correspond with the number of buffer channels
    InvalidRouting { channels: usize, routing: Vec<u16> },

    /// The level is too high and caused clipping
    Clipping { level_db: f64 },

    /// Other backend failure
    Device { details: String },
}

impl ErrorCode for PresentationError {
    fn code(&self) -> i32 {
        match self {
            PresentationError::InvalidAudioDevice { .. } => {
                PresentationErrorCodes::INVALID_AUDIO_DEVICE
            }
            PresentationError::InvalidRouting { .. } => PresentationErrorCodes::INVALID_ROUTING,
            PresentationError::Clipping { .. } => PresentationErrorCodes::CLIPPING,
            PresentationError::Device { .. } => PresentationErrorCodes::DEVICE,
        }
    }

    fn message(&self) -> String {
        match self {
            PresentationError::InvalidAudioDevice { device_id } => {
                format!("Invalid audio device: {}", device_id)
            }
            PresentationError::InvalidRouting { channels, routing } => format!(
                "Speaker routing {:?} does not match {} stimulus channel(s)",
                routing, channels
            ),
            PresentationError::Clipping { level_db } => {
                format!("Level {:.2} dB caused clipping", level_db)
            }
            PresentationError::Device { details } => format!("Playback failed: {}", details),
        }
    }
}

impl fmt::Display for PresentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PresentationError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PresentationError {}
