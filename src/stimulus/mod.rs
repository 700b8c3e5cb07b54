//! Stimulus synthesis
//!
//! Builds the N-channel gated warble tone presented on every trial:
//! 1. One warble tone per channel, each starting at its allocated phase
//! 2. 40 ms raised-cosine onset/offset ramps
//! 3. Each channel normalized to -40 dB FS RMS, the calibration reference
//!
//! All downstream gain (see `calibration::LevelCalibrator`) is relative to
//! that fixed reference.

pub mod buffer;
pub mod phase;
pub mod warble;

use serde::{Deserialize, Serialize};

pub use buffer::StimulusBuffer;

use crate::calibration::CALIBRATION_TONE_HZ;
use crate::error::ConfigError;

/// Onset/offset ramp duration in seconds
pub const RAMP_DURATION_S: f64 = 0.04;

/// Per-channel RMS reference level in dB FS
pub const REFERENCE_RMS_DB: f64 = -40.0;

/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default modulation rate in Hz
pub const DEFAULT_MODULATION_RATE_HZ: f64 = 5.0;

/// Default modulation depth (percent of carrier)
pub const DEFAULT_MODULATION_DEPTH_PCT: f64 = 5.0;

/// Parameters for one stimulus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusParams {
    pub duration_s: f64,
    pub sample_rate: u32,
    pub carrier_hz: f64,
    pub modulation_rate_hz: f64,
    pub modulation_depth_pct: f64,
    pub num_channels: usize,
}

impl StimulusParams {
    /// Defaults for everything but duration, carrier and channel count
    pub fn new(duration_s: f64, carrier_hz: f64, num_channels: usize) -> Self {
        Self {
            duration_s,
            sample_rate: DEFAULT_SAMPLE_RATE,
            carrier_hz,
            modulation_rate_hz: DEFAULT_MODULATION_RATE_HZ,
            modulation_depth_pct: DEFAULT_MODULATION_DEPTH_PCT,
            num_channels,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidStimulusParameters { reason });

        if !(self.duration_s.is_finite() && self.duration_s > 0.0) {
            return invalid(format!("duration must be positive (got {})", self.duration_s));
        }
        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".to_string());
        }
        if self.num_channels == 0 {
            return invalid("channel count must be positive".to_string());
        }
        if warble::sample_count(self.duration_s, self.sample_rate) == 0 {
            return invalid(format!(
                "duration {} s is shorter than one sample",
                self.duration_s
            ));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.carrier_hz > 0.0 && self.carrier_hz < nyquist) {
            return invalid(format!(
                "carrier {} Hz must lie in (0, {}) Hz",
                self.carrier_hz, nyquist
            ));
        }
        if !(self.modulation_rate_hz >= 0.0 && self.modulation_rate_hz.is_finite()) {
            return invalid(format!(
                "modulation rate must not be negative (got {})",
                self.modulation_rate_hz
            ));
        }
        if !(0.0..100.0).contains(&self.modulation_depth_pct) {
            return invalid(format!(
                "modulation depth must lie in [0, 100) % (got {})",
                self.modulation_depth_pct
            ));
        }
        Ok(())
    }
}

/// Synthesizes an N-channel gated warble tone
///
/// Deterministic for identical parameters.
///
/// # Errors
/// * `ConfigError::InvalidStimulusParameters` for non-positive duration,
///   sample rate or channel count, or an out-of-range carrier/modulation
/// * `ConfigError::InvalidChannelCount` for more channels than the phase pool
pub fn synthesize(params: &StimulusParams) -> Result<StimulusBuffer, ConfigError> {
    params.validate()?;
    let phases = phase::allocate(params.num_channels)?;

    let channels: Vec<Vec<f32>> = phases
        .iter()
        .map(|&phi| {
            let mut tone = warble::warble_tone(
                params.duration_s,
                params.sample_rate,
                params.carrier_hz,
                phi,
                params.modulation_rate_hz,
                params.modulation_depth_pct,
            );
            warble::apply_gate(&mut tone, RAMP_DURATION_S, params.sample_rate);
            warble::set_rms_db(&mut tone, REFERENCE_RMS_DB);
            tone.into_iter().map(|s| s as f32).collect()
        })
        .collect();

    tracing::debug!(
        carrier_hz = params.carrier_hz,
        channels = params.num_channels,
        frames = channels.first().map_or(0, Vec::len),
        "synthesized stimulus"
    );

    Ok(StimulusBuffer::new(
        params.sample_rate,
        params.carrier_hz,
        params.duration_s,
        phases,
        channels,
    ))
}

/// Mono 1 kHz warble tone at the reference level, for SLM calibration
pub fn calibration_tone(duration_s: f64, sample_rate: u32) -> Result<StimulusBuffer, ConfigError> {
    synthesize(&StimulusParams {
        sample_rate,
        ..StimulusParams::new(duration_s, CALIBRATION_TONE_HZ, 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_channel_shape() {
        let buffer = synthesize(&StimulusParams::new(1.0, 1000.0, 3)).unwrap();
        assert_eq!(buffer.shape(), (48000, 3));
        assert_eq!(buffer.phases(), phase::allocate(3).unwrap().as_slice());
    }

    #[test]
    fn test_one_channel_shape() {
        let buffer = synthesize(&StimulusParams::new(1.0, 1000.0, 1)).unwrap();
        assert_eq!(buffer.shape().1, 1);
    }

    #[test]
    fn test_channel_rms_equals_reference() {
        let buffer = synthesize(&StimulusParams::new(0.5, 2000.0, 4)).unwrap();
        for ch in 0..buffer.num_channels() {
            let level = buffer.channel_rms_db(ch).unwrap();
            assert!(
                (level - REFERENCE_RMS_DB).abs() < 1e-3,
                "channel {} RMS {} dB",
                ch,
                level
            );
        }
    }

    #[test]
    fn test_channels_differ_by_phase() {
        let buffer = synthesize(&StimulusParams::new(0.2, 500.0, 2)).unwrap();
        assert_ne!(buffer.channel(0), buffer.channel(1));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let params = StimulusParams::new(0.25, 4000.0, 3);
        assert_eq!(synthesize(&params).unwrap(), synthesize(&params).unwrap());
    }

    #[test]
    fn test_invalid_parameters() {
        let bad = [
            StimulusParams::new(0.0, 1000.0, 1),
            StimulusParams::new(-1.0, 1000.0, 1),
            StimulusParams::new(1.0, 1000.0, 0),
            StimulusParams {
                sample_rate: 0,
                ..StimulusParams::new(1.0, 1000.0, 1)
            },
            StimulusParams::new(1.0, 30000.0, 1),
        ];
        for params in bad {
            match synthesize(&params) {
                Err(ConfigError::InvalidStimulusParameters { .. }) => {}
                other => panic!(
                    "Expected InvalidStimulusParameters for {:?}, got {:?}",
                    params, other
                ),
            }
        }
    }

    #[test]
    fn test_too_many_channels() {
        match synthesize(&StimulusParams::new(1.0, 1000.0, 10)) {
            Err(ConfigError::InvalidChannelCount { .. }) => {}
            other => panic!("Expected InvalidChannelCount, got {:?}", other),
        }
    }

    #[test]
    fn test_calibration_tone() {
        let tone = calibration_tone(1.0, 44100).unwrap();
        assert_eq!(tone.shape(), (44100, 1));
        assert_eq!(tone.carrier_hz(), 1000.0);
        assert!((tone.channel_rms_db(0).unwrap() - REFERENCE_RMS_DB).abs() < 1e-3);
    }
}
