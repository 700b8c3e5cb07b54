// Reading session CSVs and writing the threshold table
//
// Trial files are located by header name, so column order and extra
// columns do not matter. Only the five columns scoring uses are parsed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ScoringError;
use crate::scoring::{ScoringRow, ThresholdRecord, THRESHOLD_HEADER};
use crate::tabular;

const SUBJECT: &str = "subject";
const CONDITION: &str = "condition";
const TEST_FREQ: &str = "test_freq";
const DESIRED_LEVEL: &str = "desired_level_dB";
const REVERSAL: &str = "reversal";

/// Load every `*.csv` file in `dir`, in file-name order
///
/// # Errors
/// * `ScoringError::Io` if the directory or a file cannot be read
/// * `ScoringError::NoRecords` if the directory holds no CSV files
/// * Any parse error from [`parse_trials`]
pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<ScoringRow>, ScoringError> {
    let dir = dir.as_ref();
    let io_error = |path: &Path, err: std::io::Error| ScoringError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    };

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|err| io_error(dir, err))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        log::warn!("[Scoring] No CSV files in {:?}", dir);
        return Err(ScoringError::NoRecords);
    }

    let mut rows = Vec::new();
    for path in &files {
        let contents = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let parsed = parse_trials(&name, &contents)?;
        log::debug!("[Scoring] {} rows from {}", parsed.len(), name);
        rows.extend(parsed);
    }

    log::info!(
        "[Scoring] Loaded {} rows from {} file(s) in {:?}",
        rows.len(),
        files.len(),
        dir
    );
    Ok(rows)
}

/// Parse one trial CSV
///
/// `source` names the input in error messages. Blank lines are skipped.
pub fn parse_trials(source: &str, contents: &str) -> Result<Vec<ScoringRow>, ScoringError> {
    let mut records = tabular::records(contents).into_iter();
    let header = loop {
        match records.next() {
            Some((_, record)) if record.trim().is_empty() => continue,
            Some((line, record)) => {
                break tabular::split_record(&record).map_err(|reason| {
                    ScoringError::MalformedRow {
                        file: source.to_string(),
                        line,
                        reason,
                    }
                })?
            }
            None => return Ok(Vec::new()),
        }
    };

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ScoringError::MissingColumn {
                file: source.to_string(),
                column: name.to_string(),
            })
    };
    let subject = column(SUBJECT)?;
    let condition = column(CONDITION)?;
    let test_freq = column(TEST_FREQ)?;
    let desired = column(DESIRED_LEVEL)?;
    let reversal = column(REVERSAL)?;

    let mut rows = Vec::new();
    for (line, record) in records {
        if record.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| ScoringError::MalformedRow {
            file: source.to_string(),
            line,
            reason,
        };

        let fields = tabular::split_record(&record).map_err(malformed)?;
        let field = |index: usize, name: &str| {
            fields
                .get(index)
                .map(|f| f.trim())
                .ok_or_else(|| malformed(format!("missing value for '{}'", name)))
        };

        rows.push(ScoringRow {
            subject: field(subject, SUBJECT)?.to_string(),
            condition: field(condition, CONDITION)?.to_string(),
            test_freq: parse_number(field(test_freq, TEST_FREQ)?, TEST_FREQ).map_err(malformed)?,
            desired_level_db: parse_number(field(desired, DESIRED_LEVEL)?, DESIRED_LEVEL)
                .map_err(malformed)?,
            reversal: parse_bool(field(reversal, REVERSAL)?).map_err(malformed)?,
        });
    }
    Ok(rows)
}

fn parse_number(value: &str, name: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {} '{}'", name, value))
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        other => Err(format!("invalid reversal flag '{}'", other)),
    }
}

/// Threshold table as CSV text, header included
pub fn thresholds_csv(thresholds: &[ThresholdRecord]) -> String {
    let mut out = tabular::join_record(THRESHOLD_HEADER);
    out.push('\n');
    for record in thresholds {
        out.push_str(&record.to_csv_row());
        out.push('\n');
    }
    out
}

/// Write the threshold table, replacing any existing file
pub fn write_thresholds<P: AsRef<Path>>(
    path: P,
    thresholds: &[ThresholdRecord],
) -> Result<(), ScoringError> {
    let path = path.as_ref();
    fs::write(path, thresholds_csv(thresholds)).map_err(|err| ScoringError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    log::info!(
        "[Scoring] Thresholds written to {:?} ({} rows)",
        path,
        thresholds.len()
    );
    Ok(())
}
