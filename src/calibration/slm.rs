// Sound-level-meter session calibration
//
// A 1 kHz warble tone scaled to the synthesizer reference (-40 dB FS RMS) is
// played at `cal_level_db` on the device and measured with a sound level
// meter. The difference between the SPL reading and the device level maps
// acoustic levels (dB SPL) onto device levels (dB FS) for the session.

use serde::{Deserialize, Serialize};

/// Frequency of the calibration reference tone (Hz)
pub const CALIBRATION_TONE_HZ: f64 = 1000.0;

/// Calibration inputs captured at session setup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlmCalibration {
    /// Device level used to play the reference tone (dB FS)
    pub cal_level_db: f64,
    /// Sound level meter reading for the reference tone (dB SPL)
    pub slm_reading: f64,
}

impl Default for SlmCalibration {
    fn default() -> Self {
        Self {
            cal_level_db: -30.0,
            slm_reading: 70.0,
        }
    }
}

impl SlmCalibration {
    pub fn new(cal_level_db: f64, slm_reading: f64) -> Self {
        Self {
            cal_level_db,
            slm_reading,
        }
    }

    /// dB SPL produced per dB FS of device level
    pub fn slm_offset(&self) -> f64 {
        self.slm_reading - self.cal_level_db
    }

    /// Offset added to an acoustic level to obtain the device level
    pub fn calibration_offset(&self) -> f64 {
        -self.slm_offset()
    }

    /// Device level (dB FS) that produces `desired_spl` at the listener
    pub fn device_level(&self, desired_spl: f64) -> f64 {
        desired_spl + self.calibration_offset()
    }
}
