//! Threshold scoring
//!
//! Offline reduction of completed session files to one threshold per
//! (subject, condition, frequency). Runs over a closed batch of trial rows
//! and never modifies its input.

pub mod scorer;
pub mod table;

use serde::{Deserialize, Serialize};

use crate::session::TrialRecord;
use crate::tabular;

pub use scorer::ThresholdScorer;
pub use table::{load_dir, parse_trials, thresholds_csv, write_thresholds};

/// Column names of the threshold table
pub const THRESHOLD_HEADER: [&str; 4] = ["subject", "condition", "test_freq", "threshold"];

/// What to do when a group has fewer reversals than requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Average however many reversals exist and log a warning
    #[default]
    AverageAvailable,
    /// Fail the whole request with `InsufficientReversals`
    Reject,
}

/// The trial columns scoring needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRow {
    pub subject: String,
    pub condition: String,
    pub test_freq: f64,
    pub desired_level_db: f64,
    pub reversal: bool,
}

impl From<&TrialRecord> for ScoringRow {
    fn from(record: &TrialRecord) -> Self {
        Self {
            subject: record.subject.clone(),
            condition: record.condition.clone(),
            test_freq: record.test_freq,
            desired_level_db: record.desired_level_db,
            reversal: record.reversal,
        }
    }
}

/// Threshold of one (subject, condition, frequency) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecord {
    pub subject: String,
    pub condition: String,
    pub test_freq: f64,
    /// Mean of the averaged reversal levels; `None` without any reversal
    pub threshold: Option<f64>,
    /// Number of reversals that went into the mean
    pub reversals_used: usize,
}

impl ThresholdRecord {
    pub fn to_csv_row(&self) -> String {
        tabular::join_record([
            self.subject.clone(),
            self.condition.clone(),
            self.test_freq.to_string(),
            self.threshold.map(|t| t.to_string()).unwrap_or_default(),
        ])
    }
}
