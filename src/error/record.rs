// Trial recorder error types

use crate::error::ErrorCode;
use std::fmt;

/// Recorder error code constants
///
/// Error code range: 6001
pub struct RecordErrorCodes {}

impl RecordErrorCodes {
    /// Writing a trial record failed
    pub const IO: i32 = 6001;
}

/// Trial persistence errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Data not saved: cannot write to file
    Io { path: String, reason: String },
}

impl ErrorCode for RecordError {
    fn code(&self) -> i32 {
        match self {
            RecordError::Io { .. } => RecordErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            RecordError::Io { path, reason } => {
                format!("Data not saved! Cannot write to {}: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for RecordError {}
