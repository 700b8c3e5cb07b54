// Listener responses for offline sessions
//
// A real session takes responses from the operator UI through
// `TrialController::submit_response`. The simulator drives the same API
// with a listener model instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::session::controller::TrialCue;
use crate::session::presenter::Interval;

/// Chance performance in a two-interval task
pub const GUESS_RATE: f64 = 0.5;

/// Source of interval choices
pub trait Listener {
    /// Pick the interval believed to contain the stimulus
    fn respond(&mut self, cue: &TrialCue, stimulus_interval: Interval) -> Interval;
}

/// Logistic psychometric function with a 50 % guess floor
///
/// The probability of a correct answer at track level `L` is
/// `g + (1 - g) / (1 + exp(-(L - threshold) / slope))`.
#[derive(Debug, Clone)]
pub struct SimulatedListener {
    threshold_db: f64,
    slope_db: f64,
    rng: StdRng,
}

impl SimulatedListener {
    pub fn new(threshold_db: f64, slope_db: f64, seed: u64) -> Self {
        Self {
            threshold_db,
            slope_db: slope_db.abs().max(f64::EPSILON),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Probability of a correct response at `level`
    pub fn p_correct(&self, level: f64) -> f64 {
        let detect = 1.0 / (1.0 + (-(level - self.threshold_db) / self.slope_db).exp());
        GUESS_RATE + (1.0 - GUESS_RATE) * detect
    }
}

impl Listener for SimulatedListener {
    fn respond(&mut self, cue: &TrialCue, stimulus_interval: Interval) -> Interval {
        let p = self.p_correct(cue.staircase_level);
        if self.rng.gen_bool(p.clamp(0.0, 1.0)) {
            stimulus_interval
        } else {
            stimulus_interval.other()
        }
    }
}
