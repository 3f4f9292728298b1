// ============================================================
// Layer 4 - CSV Table Loader
// ============================================================
// Reads the fatigue table with the `csv` crate and deserialises
// each row into a RawRecord by header name.
//
// Only Stage, Frequency_Hz, Cycle_Number and Stress_MPa are kept.
// Every other column is dropped here, including the strain
// measurement, which would otherwise make the task trivial.

use std::path::{Path, PathBuf};

use crate::domain::error::{PipelineError, Result};
use crate::domain::record::{RawRecord, CYCLE_NUMBER, FREQUENCY_HZ, STAGE, STRESS_MPA};
use crate::domain::traits::TableSource;

const REQUIRED_COLUMNS: [&str; 4] = [STAGE, FREQUENCY_HZ, CYCLE_NUMBER, STRESS_MPA];

/// Loads raw rows from a CSV file with a header line.
/// Implements the TableSource trait from Layer 3.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvLoader {
    fn load_records(&self) -> Result<Vec<RawRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        // ── Check the header line ─────────────────────────────────────────────
        let headers = reader.headers()?.clone();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(PipelineError::config(format!(
                    "input '{}' has no '{}' column",
                    self.path.display(),
                    required
                )));
            }
        }
        let discarded: Vec<&str> = headers
            .iter()
            .filter(|h| !REQUIRED_COLUMNS.contains(h))
            .collect();
        if !discarded.is_empty() {
            tracing::debug!("Discarding columns: {:?}", discarded);
        }

        // ── Deserialise rows ──────────────────────────────────────────────────
        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<RawRecord>().enumerate() {
            let record = row?;
            check_finite(&record, line)?;
            records.push(record);
        }

        tracing::info!("Loaded {} rows from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

fn check_finite(record: &RawRecord, line: usize) -> Result<()> {
    let cells = [
        (FREQUENCY_HZ, record.frequency_hz),
        (CYCLE_NUMBER, record.cycle_number),
        (STRESS_MPA,   record.stress_mpa),
    ];
    for (column, value) in cells {
        if !value.is_finite() {
            return Err(PipelineError::encoding(
                column,
                format!("non-finite value {value} in data row {}", line + 1),
            ));
        }
    }
    Ok(())
}
