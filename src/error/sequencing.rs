// Sequencing error types and constants
//
// These are programming faults in the driving layer: they should never
// occur when the trial controller is used through its command API.

use crate::error::ErrorCode;
use std::fmt;

/// Sequencing error code constants
///
/// Error code range: 3001-3007
pub struct SequencingErrorCodes {}

impl SequencingErrorCodes {
    /// Response submitted to a completed staircase
    pub const STAIRCASE_COMPLETE: i32 = 3001;

    /// Response submitted while a trial is still being presented
    pub const RESPONSE_DURING_PRESENTATION: i32 = 3002;

    /// Response submitted with no trial awaiting one
    pub const NO_TRIAL_PENDING: i32 = 3003;

    /// Trial requested before a frequency was started
    pub const NO_ACTIVE_FREQUENCY: i32 = 3004;

    /// Command issued after every frequency was tested
    pub const SESSION_FINISHED: i32 = 3005;

    /// New frequency requested while the current track is still running
    pub const FREQUENCY_IN_PROGRESS: i32 = 3006;

    /// Trial presented again before the pending response arrived
    pub const TRIAL_AWAITING_RESPONSE: i32 = 3007;
}

/// Sequencing errors
#[derive(Debug, Clone, PartialEq)]
pub enum SequencingError {
    /// add_response called after the staircase reached its reversal target
    StaircaseComplete { reversals: usize },

    /// Response arrived before both intervals finished playing
    ResponseDuringPresentation,

    /// Response arrived with no trial awaiting one (double submission)
    NoTrialPending,

    /// Trial requested before start_frequency
    NoActiveFrequency,

    /// Command issued after the session finished
    SessionFinished,

    /// start_frequency called while the current track is running
    FrequencyInProgress { frequency: f64 },

    /// present_trial called while a response is pending
    TrialAwaitingResponse,
}

impl ErrorCode for SequencingError {
    fn code(&self) -> i32 {
        match self {
            SequencingError::StaircaseComplete { .. } => SequencingErrorCodes::STAIRCASE_COMPLETE,
            SequencingError::ResponseDuringPresentation => {
                SequencingErrorCodes::RESPONSE_DURING_PRESENTATION
            }
            SequencingError::NoTrialPending => SequencingErrorCodes::NO_TRIAL_PENDING,
            SequencingError::NoActiveFrequency => SequencingErrorCodes::NO_ACTIVE_FREQUENCY,
            SequencingError::SessionFinished => SequencingErrorCodes::SESSION_FINISHED,
            SequencingError::FrequencyInProgress { .. } => {
                SequencingErrorCodes::FREQUENCY_IN_PROGRESS
            }
            SequencingError::TrialAwaitingResponse => SequencingErrorCodes::TRIAL_AWAITING_RESPONSE,
        }
    }

    fn message(&self) -> String {
        match self {
            SequencingError::StaircaseComplete { reversals } => format!(
                "Staircase already complete after {} reversals",
                reversals
            ),
            SequencingError::ResponseDuringPresentation => {
                "Response submitted during stimulus presentation".to_string()
            }
            SequencingError::NoTrialPending => "No trial is awaiting a response".to_string(),
            SequencingError::NoActiveFrequency => {
                "No frequency started. Call start_frequency() first.".to_string()
            }
            SequencingError::SessionFinished => "Session already finished".to_string(),
            SequencingError::FrequencyInProgress { frequency } => {
                format!("Staircase at {} Hz is still running", frequency)
            }
            SequencingError::TrialAwaitingResponse => {
                "Current trial is still awaiting a response".to_string()
            }
        }
    }
}

impl fmt::Display for SequencingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SequencingError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SequencingError {}
