// PEAT Core - adaptive 2IAFC threshold measurement engine
// Calibrated warble-tone stimuli, 1-up/2-down staircase tracking and
// offline threshold scoring

// Module declarations
pub mod calibration;
pub mod error;
pub mod scoring;
pub mod session;
pub mod staircase;
pub mod stimulus;
pub mod tabular;

// Re-exports for convenience
pub use calibration::{DeviceRange, LevelCalibrator, PresentationLevel, SlmCalibration};
pub use error::{ErrorCode, SessionError};
pub use scoring::{ShortfallPolicy, ThresholdRecord, ThresholdScorer};
pub use session::{SessionConfig, TrialController, TrialRecord};
pub use staircase::{Staircase, StaircaseConfig};
pub use stimulus::{synthesize, StimulusBuffer, StimulusParams};
