//! Warble tone primitives
//!
//! Building blocks for the stimulus synthesizer:
//! - Sinusoidally frequency-modulated carrier ("warble tone")
//! - Raised-cosine onset/offset gating
//! - RMS measurement and normalization in dB full scale
//!
//! All functions are pure and deterministic; they work in f64 so the RMS
//! reference is exact before conversion to the playback sample format.

use std::f64::consts::PI;

/// Number of samples for `duration_s` at `sample_rate`
#[inline]
pub fn sample_count(duration_s: f64, sample_rate: u32) -> usize {
    (duration_s * sample_rate as f64).round() as usize
}

/// Generates a warble tone.
///
/// The instantaneous frequency is
/// `fc * (1 + depth/100 * sin(2π fm t))`, and the signal starts at phase `phi`.
///
/// # Arguments
/// * `duration_s` - Length in seconds
/// * `sample_rate` - Sample rate in Hz
/// * `carrier_hz` - Carrier frequency in Hz
/// * `phi` - Starting phase in radians
/// * `mod_rate_hz` - Modulation rate in Hz
/// * `mod_depth_pct` - Peak frequency deviation as a percentage of the carrier
pub fn warble_tone(
    duration_s: f64,
    sample_rate: u32,
    carrier_hz: f64,
    phi: f64,
    mod_rate_hz: f64,
    mod_depth_pct: f64,
) -> Vec<f64> {
    let n = sample_count(duration_s, sample_rate);
    let fs = sample_rate as f64;
    let deviation_hz = carrier_hz * mod_depth_pct / 100.0;
    let mod_index = if mod_rate_hz > 0.0 {
        deviation_hz / mod_rate_hz
    } else {
        0.0
    };

    (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            // Integrated instantaneous frequency; zero modulation phase at t = 0
            let theta = phi
                + 2.0 * PI * carrier_hz * t
                + mod_index * (1.0 - (2.0 * PI * mod_rate_hz * t).cos());
            theta.sin()
        })
        .collect()
}

/// Applies raised-cosine onset and offset ramps in place.
///
/// Ramps longer than half the signal are shortened to half the signal.
pub fn apply_gate(signal: &mut [f64], ramp_s: f64, sample_rate: u32) {
    let ramp = sample_count(ramp_s, sample_rate).min(signal.len() / 2);
    if ramp == 0 {
        return;
    }

    let len = signal.len();
    for i in 0..ramp {
        let gain = 0.5 * (1.0 - (PI * i as f64 / ramp as f64).cos());
        signal[i] *= gain;
        signal[len - 1 - i] *= gain;
    }
}

/// Root mean square of a signal (0.0 for an empty signal)
pub fn rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|s| s * s).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

/// Converts dB full scale to linear amplitude
#[inline]
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Converts linear amplitude to dB full scale
#[inline]
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// Scales a signal in place so its RMS equals `target_db` dB FS.
///
/// Silent signals are left untouched.
pub fn set_rms_db(signal: &mut [f64], target_db: f64) {
    let current = rms(signal);
    if current <= 0.0 {
        return;
    }
    let gain = db_to_amplitude(target_db) / current;
    for sample in signal.iter_mut() {
        *sample *= gain;
    }
}
