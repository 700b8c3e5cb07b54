// Threshold scoring error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Scoring error code constants
///
/// Error code range: 5001-5006
pub struct ScoringErrorCodes {}

impl ScoringErrorCodes {
    pub const INVALID_REVERSAL_COUNT: i32 = 5001;
    pub const NO_RECORDS: i32 = 5002;
    pub const MISSING_COLUMN: i32 = 5003;
    pub const MALFORMED_ROW: i32 = 5004;
    pub const INSUFFICIENT_REVERSALS: i32 = 5005;
    pub const IO: i32 = 5006;
}

/// Errors rejecting a scoring request
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// Number of reversals cannot be 0 or negative
    InvalidReversalCount { requested: i64 },

    /// Nothing to score
    NoRecords,

    /// CSV header lacks a required column
    MissingColumn { file: String, column: String },

    /// A CSV row could not be parsed
    MalformedRow {
        file: String,
        line: usize,
        reason: String,
    },

    /// A group has fewer reversals than requested (strict policy only)
    InsufficientReversals {
        subject: String,
        condition: String,
        frequency: f64,
        available: usize,
        requested: usize,
    },

    /// Reading inputs or writing the threshold table failed
    Io { path: String, reason: String },
}

impl ErrorCode for ScoringError {
    fn code(&self) -> i32 {
        match self {
            ScoringError::InvalidReversalCount { .. } => ScoringErrorCodes::INVALID_REVERSAL_COUNT,
            ScoringError::NoRecords => ScoringErrorCodes::NO_RECORDS,
            ScoringError::MissingColumn { .. } => ScoringErrorCodes::MISSING_COLUMN,
            ScoringError::MalformedRow { .. } => ScoringErrorCodes::MALFORMED_ROW,
            ScoringError::InsufficientReversals { .. } => ScoringErrorCodes::INSUFFICIENT_REVERSALS,
            ScoringError::Io { .. } => ScoringErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            ScoringError::InvalidReversalCount { requested } => format!(
                "Number of reversals cannot be 0 or negative! (got {})",
                requested
            ),
            ScoringError::NoRecords => "No trial records to score".to_string(),
            ScoringError::MissingColumn { file, column } => {
                format!("{}: missing column '{}'", file, column)
            }
            ScoringError::MalformedRow { file, line, reason } => {
                format!("{}:{}: {}", file, line, reason)
            }
            ScoringError::InsufficientReversals {
                subject,
                condition,
                frequency,
                available,
                requested,
            } => format!(
                "Subject {} / {} / {} Hz has {} reversal(s), {} requested",
                subject, condition, frequency, available, requested
            ),
            ScoringError::Io { path, reason } => format!("{}: {}", path, reason),
        }
    }
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScoringError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ScoringError {}
