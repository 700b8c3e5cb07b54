// RETSPL reference table
//
// Reference equivalent threshold sound pressure levels for binaural
// listening in a diffuse sound field (ANSI S3.6, Table 9a). Presentation
// levels are only defined for these 34 frequencies; there is no
// interpolation between them.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::ConfigError;

/// Frequency (Hz) to RETSPL (dB) pairs, ascending by frequency
pub const RETSPL_TABLE: [(f64, f64); 34] = [
    (20.0, 78.1),
    (25.0, 68.7),
    (31.5, 59.5),
    (40.0, 51.1),
    (50.0, 44.0),
    (63.0, 37.5),
    (80.0, 31.5),
    (100.0, 26.5),
    (125.0, 22.1),
    (160.0, 17.9),
    (200.0, 14.4),
    (250.0, 11.4),
    (315.0, 8.4),
    (400.0, 5.8),
    (500.0, 3.8),
    (630.0, 2.1),
    (750.0, 1.2),
    (800.0, 1.0),
    (1000.0, 0.8),
    (1250.0, 1.9),
    (1500.0, 1.0),
    (1600.0, 0.5),
    (2000.0, -1.5),
    (2500.0, -3.1),
    (3000.0, -4.0),
    (4000.0, -3.8),
    (6000.0, 1.4),
    (6300.0, 2.5),
    (8000.0, 6.8),
    (9000.0, 8.4),
    (10000.0, 9.8),
    (11200.0, 11.5),
    (14000.0, 23.2),
    (16000.0, 43.7),
];

/// Table keyed by frequency in tenths of a hertz (31.5 Hz -> 315)
static RETSPL_INDEX: Lazy<HashMap<i64, f64>> = Lazy::new(|| {
    RETSPL_TABLE
        .iter()
        .map(|&(freq, offset)| (decihertz(freq), offset))
        .collect()
});

#[inline]
fn decihertz(frequency: f64) -> i64 {
    (frequency * 10.0).round() as i64
}

/// Look up the RETSPL offset for a standardized frequency
///
/// # Errors
/// `ConfigError::UnsupportedFrequency` if the frequency is not in the table.
/// Values that merely round to a listed frequency are rejected as well.
pub fn lookup(frequency: f64) -> Result<f64, ConfigError> {
    let key = decihertz(frequency);
    if !frequency.is_finite() || (frequency * 10.0 - key as f64).abs() > 1e-6 {
        return Err(ConfigError::UnsupportedFrequency { frequency });
    }
    RETSPL_INDEX
        .get(&key)
        .copied()
        .ok_or(ConfigError::UnsupportedFrequency { frequency })
}

/// Whether a frequency has a RETSPL entry
pub fn is_supported(frequency: f64) -> bool {
    lookup(frequency).is_ok()
}

/// All supported frequencies in ascending order
pub fn supported_frequencies() -> impl Iterator<Item = f64> {
    RETSPL_TABLE.iter().map(|&(freq, _)| freq)
}
