// Calibration module - reference levels and presentation level pipeline
//
// This module provides three components:
// 1. retspl: standardized per-frequency threshold offsets
// 2. SlmCalibration: session offset from a sound level meter reading
// 3. LevelCalibrator: track level -> device playback level
//
// The calibration workflow:
// 1. Play the 1 kHz reference tone at cal_level_db and read the SLM
// 2. Build SlmCalibration from the reading
// 3. Calibrate every trial's track level with its calibration_offset()

pub mod level;
pub mod retspl;
pub mod slm;

pub use level::{level_for, summation_compensation, DeviceRange, LevelCalibrator, PresentationLevel};
pub use slm::{SlmCalibration, CALIBRATION_TONE_HZ};
