// Errors surfaced by the trial controller

use std::fmt;

use crate::error::{
    CalibrationError, ConfigError, ErrorCode, PresentationError, RecordError, SequencingError,
};

/// Union of the error classes a running session can produce
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Config(ConfigError),
    Calibration(CalibrationError),
    Sequencing(SequencingError),
    Presentation(PresentationError),
    Record(RecordError),
}

impl SessionError {
    /// Presentation faults pause the session; the trial may be retried
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Presentation(_))
    }

    /// Configuration and range errors end the current frequency's staircase
    pub fn aborts_frequency(&self) -> bool {
        matches!(self, SessionError::Config(_) | SessionError::Calibration(_))
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::Config(err) => err.code(),
            SessionError::Calibration(err) => err.code(),
            SessionError::Sequencing(err) => err.code(),
            SessionError::Presentation(err) => err.code(),
            SessionError::Record(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::Config(err) => err.message(),
            SessionError::Calibration(err) => err.message(),
            SessionError::Sequencing(err) => err.message(),
            SessionError::Presentation(err) => err.message(),
            SessionError::Record(err) => err.message(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(err) => err.fmt(f),
            SessionError::Calibration(err) => err.fmt(f),
            SessionError::Sequencing(err) => err.fmt(f),
            SessionError::Presentation(err) => err.fmt(f),
            SessionError::Record(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(err) => Some(err),
            SessionError::Calibration(err) => Some(err),
            SessionError::Sequencing(err) => Some(err),
            SessionError::Presentation(err) => Some(err),
            SessionError::Record(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl From<CalibrationError> for SessionError {
    fn from(err: CalibrationError) -> Self {
        SessionError::Calibration(err)
    }
}

impl From<SequencingError> for SessionError {
    fn from(err: SequencingError) -> Self {
        SessionError::Sequencing(err)
    }
}

impl From<PresentationError> for SessionError {
    fn from(err: PresentationError) -> Self {
        SessionError::Presentation(err)
    }
}

impl From<RecordError> for SessionError {
    fn from(err: RecordError) -> Self {
        SessionError::Record(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err: SessionError = PresentationError::Clipping { level_db: 2.0 }.into();
        assert!(err.is_recoverable());
        assert!(!err.aborts_frequency());

        let err: SessionError = CalibrationError::PresentationLevelOutOfRange {
            level_db: 5.0,
            min_db: -120.0,
            max_db: 0.0,
        }
        .into();
        assert!(!err.is_recoverable());
        assert!(err.aborts_frequency());

        let err: SessionError = SequencingError::NoTrialPending.into();
        assert!(!err.is_recoverable());
        assert!(!err.aborts_frequency());
    }

    #[test]
    fn test_code_passthrough() {
        let err: SessionError = ConfigError::EmptyStepSchedule.into();
        assert_eq!(err.code(), 1004);
        assert_eq!(format!("{}", err), format!("{}", ConfigError::EmptyStepSchedule));
    }
}
