// ThresholdScorer - reduces reversal histories to thresholds
//
// Rows are grouped by (subject, condition, frequency). Within a group, rows
// keep their input order; the threshold is the mean desired level over the
// last K rows flagged as reversals, rounded to two decimals.

use std::collections::BTreeMap;

use crate::calibration::level::round2;
use crate::error::ScoringError;
use crate::scoring::{ScoringRow, ShortfallPolicy, ThresholdRecord};
use crate::session::TrialRecord;

/// Offline threshold scorer
///
/// Output is a pure function of the input rows, `num_reversals` and the
/// policy, so scoring the same batch twice yields the same table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdScorer {
    policy: ShortfallPolicy,
}

impl ThresholdScorer {
    pub fn new(policy: ShortfallPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ShortfallPolicy {
        self.policy
    }

    /// Score trial records produced by the controller
    pub fn score_records(
        &self,
        records: &[TrialRecord],
        num_reversals: i64,
    ) -> Result<Vec<ThresholdRecord>, ScoringError> {
        let rows: Vec<ScoringRow> = records.iter().map(ScoringRow::from).collect();
        self.score(&rows, num_reversals)
    }

    /// Compute one threshold per (subject, condition, frequency) group
    ///
    /// # Arguments
    /// * `rows` - Trial rows in recording order
    /// * `num_reversals` - Number of trailing reversals to average
    ///
    /// # Returns
    /// Thresholds sorted by subject, condition, then frequency
    ///
    /// # Errors
    /// * `ScoringError::InvalidReversalCount` if `num_reversals <= 0`
    /// * `ScoringError::NoRecords` for an empty batch
    /// * `ScoringError::InsufficientReversals` for a short group under
    ///   [`ShortfallPolicy::Reject`]
    pub fn score(
        &self,
        rows: &[ScoringRow],
        num_reversals: i64,
    ) -> Result<Vec<ThresholdRecord>, ScoringError> {
        if num_reversals <= 0 {
            return Err(ScoringError::InvalidReversalCount {
                requested: num_reversals,
            });
        }
        if rows.is_empty() {
            return Err(ScoringError::NoRecords);
        }
        let requested = num_reversals as usize;

        let mut groups: BTreeMap<(SubjectKey<'_>, &str, i64), Vec<&ScoringRow>> =
            BTreeMap::new();
        for row in rows {
            let key = (
                SubjectKey::new(&row.subject),
                row.condition.as_str(),
                frequency_key(row.test_freq),
            );
            groups.entry(key).or_default().push(row);
        }

        let mut thresholds = Vec::with_capacity(groups.len());
        for ((subject, condition, _), group) in groups {
            let subject = subject.as_str();
            let test_freq = group[0].test_freq;
            let reversals: Vec<f64> = group
                .iter()
                .filter(|row| row.reversal)
                .map(|row| row.desired_level_db)
                .collect();

            if reversals.len() < requested {
                match self.policy {
                    ShortfallPolicy::Reject => {
                        return Err(ScoringError::InsufficientReversals {
                            subject: subject.to_string(),
                            condition: condition.to_string(),
                            frequency: test_freq,
                            available: reversals.len(),
                            requested,
                        });
                    }
                    ShortfallPolicy::AverageAvailable => log::warn!(
                        "[ThresholdScorer] {} / {} / {} Hz: averaging {} of {} requested reversals",
                        subject,
                        condition,
                        test_freq,
                        reversals.len(),
                        requested
                    ),
                }
            }

            let used = &reversals[reversals.len().saturating_sub(requested)..];
            let threshold = if used.is_empty() {
                None
            } else {
                Some(round2(used.iter().sum::<f64>() / used.len() as f64))
            };

            thresholds.push(ThresholdRecord {
                subject: subject.to_string(),
                condition: condition.to_string(),
                test_freq,
                threshold,
                reversals_used: used.len(),
            });
        }

        log::info!(
            "[ThresholdScorer] Scored {} group(s) from {} row(s)",
            thresholds.len(),
            rows.len()
        );
        Ok(thresholds)
    }
}

/// Subject ordering: integer IDs numerically ("9" before "10"), then any
/// other label as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SubjectKey<'a> {
    Number(i64, &'a str),
    Text(&'a str),
}

impl<'a> SubjectKey<'a> {
    fn new(subject: &'a str) -> Self {
        match subject.trim().parse::<i64>() {
            Ok(number) => SubjectKey::Number(number, subject),
            Err(_) => SubjectKey::Text(subject),
        }
    }

    fn as_str(&self) -> &'a str {
        match *self {
            SubjectKey::Number(_, subject) | SubjectKey::Text(subject) => subject,
        }
    }
}

/// Frequencies are compared at 0.1 Hz resolution
fn frequency_key(frequency: f64) -> i64 {
    (frequency * 10.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(subject: &str, levels: &[f64], reversals: &[bool]) -> Vec<ScoringRow> {
        levels
            .iter()
            .zip(reversals)
            .map(|(&level, &reversal)| ScoringRow {
                subject: subject.to_string(),
                condition: "A".to_string(),
                test_freq: 1000.0,
                desired_level_db: level,
                reversal,
            })
            .collect()
    }

    fn two_subjects() -> Vec<ScoringRow> {
        let mut all = rows(
            "1234",
            &[30.0, 35.0, 40.0, 45.0],
            &[true, false, true, true],
        );
        all.extend(rows(
            "5678",
            &[50.0, 55.0, 60.0, 65.0],
            &[true, true, false, true],
        ));
        all
    }

    #[test]
    fn test_average_of_last_reversals() {
        let thresholds = ThresholdScorer::default().score(&two_subjects(), 2).unwrap();
        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[0].subject, "1234");
        assert_eq!(thresholds[0].threshold, Some(42.5));
        assert_eq!(thresholds[0].reversals_used, 2);
        assert_eq!(thresholds[1].subject, "5678");
        assert_eq!(thresholds[1].threshold, Some(60.0));
    }

    #[test]
    fn test_single_group_uses_trailing_reversals() {
        let mut all = two_subjects();
        for row in &mut all {
            row.subject = "1234".to_string();
        }
        let thresholds = ThresholdScorer::default().score(&all, 2).unwrap();
        assert_eq!(thresholds.len(), 1);
        assert_eq!(thresholds[0].threshold, Some(60.0));
    }

    #[test]
    fn test_invalid_reversal_count() {
        for n in [0, -3] {
            match ThresholdScorer::default().score(&two_subjects(), n) {
                Err(ScoringError::InvalidReversalCount { requested }) => assert_eq!(requested, n),
                other => panic!("Expected InvalidReversalCount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(
            ThresholdScorer::default().score(&[], 2),
            Err(ScoringError::NoRecords)
        );
    }

    #[test]
    fn test_shortfall_policies() {
        let data = two_subjects();

        let lenient = ThresholdScorer::default().score(&data, 5).unwrap();
        assert_eq!(lenient[0].reversals_used, 3);
        assert_eq!(lenient[0].threshold, Some(38.33));

        match ThresholdScorer::new(ShortfallPolicy::Reject).score(&data, 5) {
            Err(ScoringError::InsufficientReversals {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("Expected InsufficientReversals, got {:?}", other),
        }
        assert!(ThresholdScorer::new(ShortfallPolicy::Reject)
            .score(&data, 3)
            .is_ok());
    }

    #[test]
    fn test_group_without_reversals() {
        let data = rows("9", &[30.0, 20.0], &[false, false]);
        let thresholds = ThresholdScorer::default().score(&data, 2).unwrap();
        assert_eq!(thresholds[0].threshold, None);
        assert_eq!(thresholds[0].reversals_used, 0);
    }

    #[test]
    fn test_groups_sorted_by_subject_condition_frequency() {
        let mut data = Vec::new();
        for (subject, condition, freq) in [
            ("B", "x", 500.0),
            ("A", "y", 4000.0),
            ("A", "x", 4000.0),
            ("A", "x", 500.0),
        ] {
            data.push(ScoringRow {
                subject: subject.to_string(),
                condition: condition.to_string(),
                test_freq: freq,
                desired_level_db: 10.0,
                reversal: true,
            });
        }
        let keys: Vec<(String, String, f64)> = ThresholdScorer::default()
            .score(&data, 1)
            .unwrap()
            .into_iter()
            .map(|t| (t.subject, t.condition, t.test_freq))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A".to_string(), "x".to_string(), 500.0),
                ("A".to_string(), "x".to_string(), 4000.0),
                ("A".to_string(), "y".to_string(), 4000.0),
                ("B".to_string(), "x".to_string(), 500.0),
            ]
        );
    }

    #[test]
    fn test_numeric_subjects_sort_numerically() {
        let mut data = Vec::new();
        for subject in ["10", "P2", "9", "100", "007"] {
            data.extend(rows(subject, &[10.0], &[true]));
        }
        let subjects: Vec<String> = ThresholdScorer::default()
            .score(&data, 1)
            .unwrap()
            .into_iter()
            .map(|t| t.subject)
            .collect();
        assert_eq!(subjects, vec!["007", "9", "10", "100", "P2"]);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = ThresholdScorer::default();
        let data = two_subjects();
        assert_eq!(scorer.score(&data, 2), scorer.score(&data, 2));
    }
}
