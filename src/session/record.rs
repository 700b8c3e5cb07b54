// TrialRecord - one completed 2IAFC trial
//
// Built by the trial controller at trial completion and never mutated
// afterwards. The CSV row carries the persisted columns in the fixed order
// the scoring side expects; stimulus/response intervals and the raw
// staircase level are kept on the struct for in-process consumers.

use serde::{Deserialize, Serialize};

use crate::session::presenter::Interval;
use crate::tabular;

/// Persisted column names, in write order
pub const CSV_HEADER: [&str; 17] = [
    "trial",
    "subject",
    "condition",
    "min_level",
    "max_level",
    "duration",
    "step_sizes",
    "num_reversals",
    "rapid_descend",
    "slm_reading",
    "cal_level_dB",
    "slm_offset",
    "adjusted_level_dB",
    "desired_level_dB",
    "test_freq",
    "response",
    "reversal",
];

/// Immutable record of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Session-wide 1-based trial counter
    pub trial: u32,
    pub subject: String,
    pub condition: String,
    pub min_level: f64,
    pub max_level: f64,
    pub duration: f64,
    /// Step schedule as entered ("10, 5, 2")
    pub step_sizes: String,
    pub num_reversals: u32,
    pub rapid_descend: bool,
    pub slm_reading: f64,
    pub cal_level_db: f64,
    pub slm_offset: f64,
    /// Device level handed to the presenter
    pub adjusted_level_db: f64,
    /// Per-channel acoustic level (RETSPL and summation applied)
    pub desired_level_db: f64,
    pub test_freq: f64,
    /// +1 correct, -1 incorrect
    pub response: i8,
    pub reversal: bool,
    /// Track level before the response
    pub staircase_level: f64,
    pub stimulus_interval: Interval,
    pub response_interval: Interval,
}

impl TrialRecord {
    pub fn is_correct(&self) -> bool {
        self.response > 0
    }

    /// Header line for a new trial file
    pub fn csv_header() -> String {
        tabular::join_record(CSV_HEADER)
    }

    /// Persisted columns as one CSV line
    pub fn to_csv_row(&self) -> String {
        tabular::join_record([
            self.trial.to_string(),
            self.subject.clone(),
            self.condition.clone(),
            self.min_level.to_string(),
            self.max_level.to_string(),
            self.duration.to_string(),
            self.step_sizes.clone(),
            self.num_reversals.to_string(),
            if self.rapid_descend { "Yes" } else { "No" }.to_string(),
            self.slm_reading.to_string(),
            self.cal_level_db.to_string(),
            self.slm_offset.to_string(),
            self.adjusted_level_db.to_string(),
            self.desired_level_db.to_string(),
            self.test_freq.to_string(),
            self.response.to_string(),
            if self.reversal { "True" } else { "False" }.to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TrialRecord {
        TrialRecord {
            trial: 3,
            subject: "P01".to_string(),
            condition: "aided".to_string(),
            min_level: -50.0,
            max_level: 90.0,
            duration: 2.0,
            step_sizes: "10, 5, 2".to_string(),
            num_reversals: 5,
            rapid_descend: true,
            slm_reading: 70.0,
            cal_level_db: -30.0,
            slm_offset: 100.0,
            adjusted_level_db: -69.2,
            desired_level_db: 30.8,
            test_freq: 1000.0,
            response: -1,
            reversal: true,
            staircase_level: 30.0,
            stimulus_interval: Interval::First,
            response_interval: Interval::Second,
        }
    }

    #[test]
    fn test_header_order() {
        assert_eq!(
            TrialRecord::csv_header(),
            "trial,subject,condition,min_level,max_level,duration,step_sizes,\
             num_reversals,rapid_descend,slm_reading,cal_level_dB,slm_offset,\
             adjusted_level_dB,desired_level_dB,test_freq,response,reversal"
        );
    }

    #[test]
    fn test_csv_row() {
        let row = sample_record().to_csv_row();
        assert_eq!(
            row,
            "3,P01,aided,-50,90,2,\"10, 5, 2\",5,Yes,70,-30,100,-69.2,30.8,1000,-1,True"
        );
        let fields = tabular::split_record(&row).unwrap();
        assert_eq!(fields.len(), CSV_HEADER.len());
    }

    #[test]
    fn test_is_correct() {
        let mut record = sample_record();
        assert!(!record.is_correct());
        record.response = 1;
        assert!(record.is_correct());
    }
}
