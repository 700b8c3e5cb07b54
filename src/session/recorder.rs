// Trial recorders
//
// The controller hands every completed TrialRecord to a TrialRecorder before
// it commits the staircase update. A failed write therefore leaves the track
// exactly where it was.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::RecordError;
use crate::session::record::TrialRecord;

/// Sink for completed trials
pub trait TrialRecorder {
    /// Persist one record
    ///
    /// # Errors
    /// `RecordError::Io` when the record could not be written.
    fn record(&mut self, record: &TrialRecord) -> Result<(), RecordError>;
}

/// Keeps records in memory, in submission order
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    records: Vec<TrialRecord>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TrialRecord> {
        self.records
    }
}

impl TrialRecorder for MemoryRecorder {
    fn record(&mut self, record: &TrialRecord) -> Result<(), RecordError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Appends one CSV row per trial, flushing after every write
///
/// The header is written when the file is created or empty.
#[derive(Debug)]
pub struct CsvRecorder {
    path: PathBuf,
    file: File,
    written: usize,
}

impl CsvRecorder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordError> {
        let path = path.as_ref().to_path_buf();
        let io_error = |err: std::io::Error| RecordError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        let is_empty = file.metadata().map_err(io_error)?.len() == 0;
        if is_empty {
            writeln!(file, "{}", TrialRecord::csv_header()).map_err(io_error)?;
            file.flush().map_err(io_error)?;
        }

        log::info!("[CsvRecorder] Writing trials to {:?}", path);
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written through this recorder
    pub fn written(&self) -> usize {
        self.written
    }
}

impl TrialRecorder for CsvRecorder {
    fn record(&mut self, record: &TrialRecord) -> Result<(), RecordError> {
        writeln!(self.file, "{}", record.to_csv_row())
            .and_then(|_| self.file.flush())
            .map_err(|err| RecordError::Io {
                path: self.path.display().to_string(),
                reason: err.to_string(),
            })?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::presenter::Interval;
    use std::fs;

    fn record(trial: u32) -> TrialRecord {
        TrialRecord {
            trial,
            subject: "P01".to_string(),
            condition: "TEST".to_string(),
            min_level: -50.0,
            max_level: 90.0,
            duration: 2.0,
            step_sizes: "10, 5, 2".to_string(),
            num_reversals: 5,
            rapid_descend: false,
            slm_reading: 70.0,
            cal_level_db: -30.0,
            slm_offset: 100.0,
            adjusted_level_db: -66.2,
            desired_level_db: 33.8,
            test_freq: 500.0,
            response: 1,
            reversal: false,
            staircase_level: 30.0,
            stimulus_interval: Interval::First,
            response_interval: Interval::First,
        }
    }

    #[test]
    fn test_memory_recorder_keeps_order() {
        let mut recorder = MemoryRecorder::new();
        recorder.record(&record(1)).unwrap();
        recorder.record(&record(2)).unwrap();
        let trials: Vec<u32> = recorder.records().iter().map(|r| r.trial).collect();
        assert_eq!(trials, vec![1, 2]);
    }

    #[test]
    fn test_csv_recorder_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P01_TEST.csv");

        let mut recorder = CsvRecorder::open(&path).unwrap();
        recorder.record(&record(1)).unwrap();
        assert_eq!(recorder.written(), 1);
        drop(recorder);

        // Reopening appends without a second header
        let mut recorder = CsvRecorder::open(&path).unwrap();
        recorder.record(&record(2)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TrialRecord::csv_header());
        assert!(lines[1].starts_with("1,P01,TEST"));
        assert!(lines[2].starts_with("2,P01,TEST"));
    }

    #[test]
    fn test_csv_recorder_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trials.csv");
        match CsvRecorder::open(&path) {
            Err(RecordError::Io { .. }) => {}
            other => panic!("Expected Io error, got {:?}", other),
        }
    }
}
