//! Presentation collaborator seam
//!
//! The trial controller never touches audio hardware. It hands a
//! [`PresentationRequest`] to a [`Presenter`], whose `present` call returns
//! only once playback has finished (or failed). Interval cues and the silent
//! waits between them go through the same trait so a fake presenter can run
//! a whole session without real-time sleeps.

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::error::PresentationError;
use crate::stimulus::warble::amplitude_to_db;
use crate::stimulus::{StimulusBuffer, REFERENCE_RMS_DB};

/// One of the two observation intervals of a 2IAFC trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Interval {
    First,
    Second,
}

impl Interval {
    pub const ALL: [Interval; 2] = [Interval::First, Interval::Second];

    /// 1-based interval number as shown to the listener
    pub fn number(self) -> u8 {
        match self {
            Interval::First => 1,
            Interval::Second => 2,
        }
    }

    pub fn other(self) -> Interval {
        match self {
            Interval::First => Interval::Second,
            Interval::Second => Interval::First,
        }
    }
}

impl From<Interval> for u8 {
    fn from(interval: Interval) -> Self {
        interval.number()
    }
}

impl TryFrom<u8> for Interval {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Interval::First),
            2 => Ok(Interval::Second),
            other => Err(format!("interval must be 1 or 2 (got {})", other)),
        }
    }
}

/// Everything a presenter needs to play one stimulus
#[derive(Debug, Clone, Copy)]
pub struct PresentationRequest<'a> {
    pub buffer: &'a StimulusBuffer,
    /// Target per-channel RMS level in dB FS
    pub level_db: f64,
    pub device_id: i32,
    /// 1-based output channel per buffer channel
    pub channel_routing: &'a [u16],
}

impl PresentationRequest<'_> {
    /// Linear gain from the synthesis reference to the requested level
    pub fn gain(&self) -> f64 {
        10f64.powf((self.level_db - REFERENCE_RMS_DB) / 20.0)
    }

    /// Highest output sample magnitude after gain, in dB FS
    pub fn peak_db(&self) -> f64 {
        let peak = self
            .buffer
            .channels()
            .flat_map(|channel| channel.iter())
            .fold(0.0f64, |acc, &s| acc.max(s.abs() as f64));
        amplitude_to_db(peak * self.gain())
    }
}

/// External audio presentation
pub trait Presenter {
    /// Play the stimulus; returns once playback completed
    ///
    /// # Errors
    /// Device, routing and clipping faults. The caller treats all of them as
    /// recoverable and leaves the staircase untouched.
    fn present(&mut self, request: &PresentationRequest<'_>) -> Result<(), PresentationError>;

    /// Hold for `duration_s` seconds of silence
    fn wait(&mut self, duration_s: f64);

    /// Visual interval indicator; `None` clears it
    fn cue(&mut self, _interval: Option<Interval>) {}
}

/// Presenter that validates requests without producing sound
///
/// Time is accumulated instead of slept, so sessions run instantly in tests
/// and in the offline simulator.
#[derive(Debug, Default, Clone)]
pub struct SilentPresenter {
    presentations: usize,
    elapsed_s: f64,
    cues: Vec<Option<Interval>>,
    last_level_db: Option<f64>,
    fail_next: Option<PresentationError>,
}

impl SilentPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `present` calls
    pub fn presentations(&self) -> usize {
        self.presentations
    }

    /// Simulated playback and silence time in seconds
    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn cues(&self) -> &[Option<Interval>] {
        &self.cues
    }

    pub fn last_level_db(&self) -> Option<f64> {
        self.last_level_db
    }

    /// Make the next `present` call fail with `err`
    pub fn fail_next(&mut self, err: PresentationError) {
        self.fail_next = Some(err);
    }
}

impl Presenter for SilentPresenter {
    fn present(&mut self, request: &PresentationRequest<'_>) -> Result<(), PresentationError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        if request.device_id < 0 {
            return Err(PresentationError::InvalidAudioDevice {
                device_id: request.device_id,
            });
        }
        if request.channel_routing.len() != request.buffer.num_channels()
            || request.channel_routing.contains(&0)
        {
            return Err(PresentationError::InvalidRouting {
                channels: request.buffer.num_channels(),
                routing: request.channel_routing.to_vec(),
            });
        }
        if request.peak_db() > 0.0 {
            return Err(PresentationError::Clipping {
                level_db: request.level_db,
            });
        }

        self.presentations += 1;
        self.last_level_db = Some(request.level_db);
        self.elapsed_s += request.buffer.duration_s();
        log::trace!(
            "[SilentPresenter] {} Hz at {:.2} dB FS on {:?}",
            request.buffer.carrier_hz(),
            request.level_db,
            request.channel_routing
        );
        Ok(())
    }

    fn wait(&mut self, duration_s: f64) {
        self.elapsed_s += duration_s.max(0.0);
    }

    fn cue(&mut self, interval: Option<Interval>) {
        self.cues.push(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::{synthesize, StimulusParams};

    fn buffer(channels: usize) -> StimulusBuffer {
        synthesize(&StimulusParams::new(0.1, 1000.0, channels)).unwrap()
    }

    #[test]
    fn test_interval_numbers() {
        assert_eq!(Interval::First.number(), 1);
        assert_eq!(Interval::Second.number(), 2);
        assert_eq!(Interval::First.other(), Interval::Second);
        assert_eq!(Interval::try_from(2u8), Ok(Interval::Second));
        assert!(Interval::try_from(3u8).is_err());
    }

    #[test]
    fn test_interval_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Interval::Second).unwrap(), "2");
        let parsed: Interval = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Interval::First);
        assert!(serde_json::from_str::<Interval>("0").is_err());
    }

    #[test]
    fn test_gain_is_relative_to_reference() {
        let buffer = buffer(1);
        let request = PresentationRequest {
            buffer: &buffer,
            level_db: REFERENCE_RMS_DB,
            device_id: 0,
            channel_routing: &[1],
        };
        assert!((request.gain() - 1.0).abs() < 1e-12);

        let louder = PresentationRequest {
            level_db: REFERENCE_RMS_DB + 20.0,
            ..request
        };
        assert!((louder.gain() - 10.0).abs() < 1e-9);
        assert!((louder.peak_db() - request.peak_db() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_presenter_accepts_valid_request() {
        let buffer = buffer(2);
        let mut presenter = SilentPresenter::new();
        let request = PresentationRequest {
            buffer: &buffer,
            level_db: -60.0,
            device_id: 3,
            channel_routing: &[1, 2],
        };
        presenter.present(&request).unwrap();
        presenter.wait(0.5);
        assert_eq!(presenter.presentations(), 1);
        assert_eq!(presenter.last_level_db(), Some(-60.0));
        assert!((presenter.elapsed_s() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_silent_presenter_errors() {
        let buffer = buffer(2);
        let mut presenter = SilentPresenter::new();
        let base = PresentationRequest {
            buffer: &buffer,
            level_db: -60.0,
            device_id: 0,
            channel_routing: &[1, 2],
        };

        let request = PresentationRequest {
            channel_routing: &[1],
            ..base
        };
        assert!(matches!(
            presenter.present(&request),
            Err(PresentationError::InvalidRouting { channels: 2, .. })
        ));

        let request = PresentationRequest {
            device_id: -1,
            ..base
        };
        assert!(matches!(
            presenter.present(&request),
            Err(PresentationError::InvalidAudioDevice { device_id: -1 })
        ));

        let request = PresentationRequest {
            level_db: 0.0,
            ..base
        };
        assert!(matches!(
            presenter.present(&request),
            Err(PresentationError::Clipping { .. })
        ));

        presenter.fail_next(PresentationError::Device {
            details: "unplugged".to_string(),
        });
        assert!(presenter.present(&base).is_err());
        assert!(presenter.present(&base).is_ok());
        assert_eq!(presenter.presentations(), 1);
    }
}
