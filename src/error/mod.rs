// Error types for the threshold estimation engine
//
// Errors are grouped by how the session must react to them: configuration
// and range errors abort the current frequency, sequencing errors are
// programming faults, presentation errors pause the session for a retry,
// and scoring errors reject a scoring request without touching its input.

mod calibration;
mod config;
mod presentation;
mod record;
mod scoring;
mod sequencing;
mod session;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use presentation::{log_presentation_error, PresentationError, PresentationErrorCodes};
pub use record::{RecordError, RecordErrorCodes};
pub use scoring::{ScoringError, ScoringErrorCodes};
pub use sequencing::{SequencingError, SequencingErrorCodes};
pub use session::SessionError;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so operator-facing surfaces can show a stable
/// code next to the human-readable text.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
