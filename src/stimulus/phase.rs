//! Channel phase allocation
//!
//! Each loudspeaker channel starts its warble tone at a different phase so
//! the channels do not sum coherently at the listener. Phases come from a
//! fixed, pre-vetted pool ordered so that the first few entries are as far
//! apart as possible; a request for N channels always returns the first N.

use crate::error::ConfigError;

/// Starting phases in degrees, in allocation order
pub const PHASE_POOL_DEGREES: [f64; 9] = [
    140.0, 120.0, 40.0, 80.0, -80.0, 0.0, -140.0, -120.0, -40.0,
];

/// Largest channel count the pool can serve
pub const MAX_CHANNELS: usize = PHASE_POOL_DEGREES.len();

/// Starting phases (radians) for `num_channels` channels
///
/// Deterministic: repeated calls with the same count return the same phases
/// in the same order.
///
/// # Errors
/// `ConfigError::InvalidChannelCount` unless `1 <= num_channels <= 9`.
pub fn allocate(num_channels: usize) -> Result<Vec<f64>, ConfigError> {
    if num_channels == 0 || num_channels > MAX_CHANNELS {
        return Err(ConfigError::InvalidChannelCount {
            requested: num_channels,
            max: MAX_CHANNELS,
        });
    }

    Ok(PHASE_POOL_DEGREES[..num_channels]
        .iter()
        .map(|deg| deg.to_radians())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn test_one_channel() {
        assert!(approx(&allocate(1).unwrap(), &[2.443461]));
    }

    #[test]
    fn test_three_channels() {
        assert!(approx(
            &allocate(3).unwrap(),
            &[2.443461, 2.094395, 0.6981317]
        ));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let first = allocate(3).unwrap();
        for _ in 0..10 {
            assert_eq!(allocate(3).unwrap(), first);
        }
    }

    #[test]
    fn test_allocation_is_prefix_of_pool() {
        let all = allocate(MAX_CHANNELS).unwrap();
        for n in 1..=MAX_CHANNELS {
            assert_eq!(allocate(n).unwrap(), all[..n].to_vec());
        }
    }

    #[test]
    fn test_phases_do_not_overlap() {
        let all = allocate(MAX_CHANNELS).unwrap();
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert!((all[i] - all[j]).abs() > 1e-3);
            }
        }
    }

    #[test]
    fn test_invalid_channel_counts() {
        for n in [0, 10, 100] {
            match allocate(n) {
                Err(ConfigError::InvalidChannelCount { requested, max }) => {
                    assert_eq!(requested, n);
                    assert_eq!(max, 9);
                }
                other => panic!("Expected InvalidChannelCount for {}, got {:?}", n, other),
            }
        }
    }
}
