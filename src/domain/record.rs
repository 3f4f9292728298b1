// ============================================================
// Layer 3 - Records and the Feature Table
// ============================================================
// RawRecord is one row of the source table exactly as the
// loader deserialises it. FeatureTable is the same table after
// categorical encoding: every working column is numeric and
// each row carries an integer class label derived from
// Frequency_Hz.
//
// Column order of the feature table:
//   Stage | Cycle_Number | Stress_MPa | Frequency_Class
//
// Frequency_Class mirrors the label of its row, so label noise
// must go through `relabel` to keep the two in sync.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

pub const STAGE: &str = "Stage";
pub const FREQUENCY_HZ: &str = "Frequency_Hz";
pub const CYCLE_NUMBER: &str = "Cycle_Number";
pub const STRESS_MPA: &str = "Stress_MPa";
pub const FREQUENCY_CLASS: &str = "Frequency_Class";

/// Working feature columns, in table order.
pub const FEATURE_COLUMNS: [&str; 4] = [STAGE, CYCLE_NUMBER, STRESS_MPA, FREQUENCY_CLASS];

/// One row of the source file. Columns not listed here are dropped
/// by the loader (the strain measurement among them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Stage")]
    pub stage: String,

    #[serde(rename = "Frequency_Hz")]
    pub frequency_hz: f64,

    #[serde(rename = "Cycle_Number")]
    pub cycle_number: f64,

    #[serde(rename = "Stress_MPa")]
    pub stress_mpa: f64,
}

impl RawRecord {
    pub fn new(
        stage:        impl Into<String>,
        frequency_hz: f64,
        cycle_number: f64,
        stress_mpa:   f64,
    ) -> Self {
        Self { stage: stage.into(), frequency_hz, cycle_number, stress_mpa }
    }
}

/// Sort rows by (Frequency_Hz, Cycle_Number). Stable, so rows that
/// tie on both keys keep their on-disk order.
pub fn sort_records(records: &mut [RawRecord]) {
    records.sort_by(|a, b| {
        a.frequency_hz
            .total_cmp(&b.frequency_hz)
            .then_with(|| a.cycle_number.total_cmp(&b.cycle_number))
    });
}

/// The encoded, row-ordered table every later stage works on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns:      Vec<String>,
    rows:         Vec<Vec<f64>>,
    labels:       Vec<usize>,
    label_column: usize,
    num_classes:  usize,
}

impl FeatureTable {
    pub fn new(
        columns:      Vec<String>,
        rows:         Vec<Vec<f64>>,
        labels:       Vec<usize>,
        label_column: usize,
        num_classes:  usize,
    ) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(PipelineError::config(format!(
                "feature table has {} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if label_column >= columns.len() {
            return Err(PipelineError::config(format!(
                "label column index {label_column} out of range for {} columns",
                columns.len()
            )));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(PipelineError::config(format!(
                "row {bad} has {} values, expected {}",
                rows[bad].len(),
                columns.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(PipelineError::config(format!(
                "label {bad} out of range for {num_classes} classes"
            )));
        }
        Ok(Self { columns, rows, labels, label_column, num_classes })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn label_column(&self) -> usize {
        self.label_column
    }

    /// All values of one column, top to bottom.
    #[cfg(test)]
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[col]).collect()
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: f64) {
        self.rows[row][col] = value;
    }

    /// Replace a row's class and its label-derived feature cell together.
    pub fn relabel(&mut self, row: usize, class: usize) {
        debug_assert!(class < self.num_classes);
        self.labels[row] = class;
        self.rows[row][self.label_column] = class as f64;
    }

    /// Per-class row counts, indexed by class code.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}
