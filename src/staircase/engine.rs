// Staircase - 1-up/2-down adaptive track for one test frequency
//
// The engine starts in rapid descent (1-down) when enabled and switches to
// the 2-down tracking rule at the first reversal. Any incorrect response
// raises the level. The step size shrinks after every reversal until the
// schedule is exhausted, then the last step repeats. The track is complete
// once the target number of reversals has been reached.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SequencingError};

/// Consecutive correct responses required to step down in standard phase
const DOWN_RULE: u32 = 2;

/// Direction of a level change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Tracking rule currently in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 1-down until the first reversal
    RapidDescent,
    /// 1-up/2-down
    Standard,
}

/// Whether the track still accepts responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Running,
    Complete,
}

/// Staircase parameters, validated by [`Staircase::new`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseConfig {
    pub starting_level: f64,
    pub min_level: f64,
    pub max_level: f64,
    pub step_sizes: Vec<u32>,
    pub target_reversals: u32,
    pub rapid_descend: bool,
}

impl StaircaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_sizes.is_empty() {
            return Err(ConfigError::EmptyStepSchedule);
        }
        if let Some((index, &value)) = self
            .step_sizes
            .iter()
            .enumerate()
            .find(|(_, &step)| step == 0)
        {
            return Err(ConfigError::InvalidStepSize { index, value });
        }
        if self.target_reversals == 0 {
            return Err(ConfigError::InvalidReversalCount {
                requested: self.target_reversals,
            });
        }
        if !(self.min_level.is_finite() && self.max_level.is_finite())
            || self.max_level <= self.min_level
        {
            return Err(ConfigError::InvalidLevelBounds {
                min_level: self.min_level,
                max_level: self.max_level,
            });
        }
        if !(self.min_level..=self.max_level).contains(&self.starting_level) {
            return Err(ConfigError::StartingLevelOutOfBounds {
                starting_level: self.starting_level,
                min_level: self.min_level,
                max_level: self.max_level,
            });
        }
        Ok(())
    }
}

/// One response and its effect on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// 1-based trial number within this track
    pub trial: u32,
    /// Level presented on this trial
    pub level: f64,
    pub correct: bool,
    /// Level change triggered by this response, if any
    pub moved: Option<Direction>,
    /// Whether this response reversed the track direction
    pub reversal: bool,
    /// Level for the next trial
    pub next_level: f64,
    pub phase: Phase,
}

impl TrackPoint {
    /// Response coded as +1 (correct) / -1 (incorrect)
    pub fn response_code(&self) -> i8 {
        if self.correct {
            1
        } else {
            -1
        }
    }
}

/// Adaptive staircase state for one frequency
#[derive(Debug, Clone)]
pub struct Staircase {
    current_level: f64,
    step_sizes: Vec<u32>,
    step_index: usize,
    direction_history: Vec<Direction>,
    consecutive_correct: u32,
    consecutive_incorrect: u32,
    reversals: Vec<f64>,
    phase: Phase,
    min_level: f64,
    max_level: f64,
    target_reversals: usize,
    status: Status,
    history: Vec<TrackPoint>,
}

impl Staircase {
    /// Create a new staircase
    ///
    /// # Errors
    /// Any `ConfigError` from [`StaircaseConfig::validate`]; nothing is
    /// constructed on failure.
    pub fn new(config: &StaircaseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            current_level: config.starting_level,
            step_sizes: config.step_sizes.clone(),
            step_index: 0,
            direction_history: Vec::new(),
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            reversals: Vec::new(),
            phase: if config.rapid_descend {
                Phase::RapidDescent
            } else {
                Phase::Standard
            },
            min_level: config.min_level,
            max_level: config.max_level,
            target_reversals: config.target_reversals as usize,
            status: Status::Running,
            history: Vec::new(),
        })
    }

    pub fn current_level(&self) -> f64 {
        self.current_level
    }

    /// Step size used by the next level change
    pub fn current_step(&self) -> f64 {
        self.step_sizes[self.step_index] as f64
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_level, self.max_level)
    }

    /// Levels at which the track changed direction
    pub fn reversals(&self) -> &[f64] {
        &self.reversals
    }

    pub fn target_reversals(&self) -> usize {
        self.target_reversals
    }

    pub fn direction_history(&self) -> &[Direction] {
        &self.direction_history
    }

    pub fn consecutive_correct(&self) -> u32 {
        self.consecutive_correct
    }

    pub fn consecutive_incorrect(&self) -> u32 {
        self.consecutive_incorrect
    }

    /// Every response processed so far
    pub fn history(&self) -> &[TrackPoint] {
        &self.history
    }

    /// Submit one response
    ///
    /// # Errors
    /// `SequencingError::StaircaseComplete` once the reversal target has been
    /// reached; the state is left untouched.
    pub fn add_response(&mut self, correct: bool) -> Result<TrackPoint, SequencingError> {
        if self.is_complete() {
            return Err(SequencingError::StaircaseComplete {
                reversals: self.reversals.len(),
            });
        }

        let presented = self.current_level;
        let phase = self.phase;
        let moved = if correct {
            self.consecutive_correct += 1;
            self.consecutive_incorrect = 0;
            let required = match self.phase {
                Phase::RapidDescent => 1,
                Phase::Standard => DOWN_RULE,
            };
            if self.consecutive_correct >= required {
                self.consecutive_correct = 0;
                Some(Direction::Down)
            } else {
                None
            }
        } else {
            self.consecutive_incorrect += 1;
            self.consecutive_correct = 0;
            Some(Direction::Up)
        };

        let mut reversal = false;
        if let Some(direction) = moved {
            reversal = self
                .direction_history
                .last()
                .is_some_and(|&previous| previous != direction);
            self.move_level(direction);
            self.direction_history.push(direction);

            if reversal {
                self.record_reversal(presented);
            }
        }

        let point = TrackPoint {
            trial: self.history.len() as u32 + 1,
            level: presented,
            correct,
            moved,
            reversal,
            next_level: self.current_level,
            phase,
        };
        self.history.push(point);

        tracing::debug!(
            trial = point.trial,
            level = presented,
            correct,
            reversal,
            next_level = self.current_level,
            reversals = self.reversals.len(),
            "staircase response"
        );

        Ok(point)
    }

    fn move_level(&mut self, direction: Direction) {
        let step = self.current_step();
        let next = match direction {
            Direction::Up => self.current_level + step,
            Direction::Down => self.current_level - step,
        };
        self.current_level = next.clamp(self.min_level, self.max_level);
    }

    fn record_reversal(&mut self, level: f64) {
        self.reversals.push(level);
        self.phase = Phase::Standard;
        if self.step_index + 1 < self.step_sizes.len() {
            self.step_index += 1;
        }
        if self.reversals.len() >= self.target_reversals {
            self.status = Status::Complete;
            tracing::info!(
                reversals = self.reversals.len(),
                final_level = self.current_level,
                "staircase complete"
            );
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
