// ============================================================
// Layer 4 - Feature Encoder
// ============================================================
// Two steps, run on either side of noise injection:
//
//   1. FeatureEncoder  - categorical columns → dense integer codes
//        Stage         : distinct strings, sorted lexicographically
//        Frequency_Hz  : distinct values, sorted numerically;
//                        the code is the class label (K = #codes)
//
//   2. MinMaxScaler    - every working column → [0, 1]
//        x' = (x - min) / (max - min), constant columns → 0
//
// KNOWN LEAKAGE: the scaler is fit on the whole table, i.e. on
// rows that later end up in validation and test windows. This
// mirrors how the experiment has always been run and is kept as
// the default so results stay comparable. A train-only fit would
// need the split to happen before scaling.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::domain::error::{PipelineError, Result};
use crate::domain::record::{
    FeatureTable, RawRecord, FEATURE_COLUMNS, FREQUENCY_CLASS, FREQUENCY_HZ, STAGE,
};

// ─── CategoricalEncoder ───────────────────────────────────────────────────────
/// Maps the distinct values of one column to 0..n in sorted order.
#[derive(Clone)]
pub struct CategoricalEncoder<T> {
    column:  String,
    classes: Vec<T>,
    cmp:     fn(&T, &T) -> Ordering,
}

impl<T: Clone + fmt::Debug> CategoricalEncoder<T> {
    pub fn fit_by<'a, I>(column: impl Into<String>, values: I, cmp: fn(&T, &T) -> Ordering) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut classes: Vec<T> = values.into_iter().cloned().collect();
        classes.sort_by(cmp);
        classes.dedup_by(|a, b| cmp(a, b) == Ordering::Equal);
        Self { column: column.into(), classes, cmp }
    }

    /// Code of a value seen during fitting.
    pub fn encode(&self, value: &T) -> Result<usize> {
        self.classes
            .binary_search_by(|c| (self.cmp)(c, value))
            .map_err(|_| {
                PipelineError::encoding(&self.column, format!("unseen value {value:?}"))
            })
    }

    pub fn classes(&self) -> &[T] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for CategoricalEncoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoricalEncoder")
            .field("column", &self.column)
            .field("classes", &self.classes)
            .finish()
    }
}

impl CategoricalEncoder<String> {
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a String>) -> Self {
        Self::fit_by(column, values, |a: &String, b: &String| a.cmp(b))
    }
}

impl CategoricalEncoder<f64> {
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a f64>) -> Self {
        Self::fit_by(column, values, f64::total_cmp)
    }
}

// ─── FeatureEncoder ───────────────────────────────────────────────────────────
/// Encodes sorted raw rows into the numeric feature table.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    stages:      CategoricalEncoder<String>,
    frequencies: CategoricalEncoder<f64>,
}

impl FeatureEncoder {
    pub fn fit(records: &[RawRecord]) -> Self {
        let stages      = CategoricalEncoder::<String>::fit(STAGE, records.iter().map(|r| &r.stage));
        let frequencies = CategoricalEncoder::<f64>::fit(FREQUENCY_HZ, records.iter().map(|r| &r.frequency_hz));
        Self { stages, frequencies }
    }

    /// Number of frequency classes (K).
    pub fn num_classes(&self) -> usize {
        self.frequencies.len()
    }

    pub fn frequencies(&self) -> &[f64] {
        self.frequencies.classes()
    }

    pub fn stages(&self) -> &[String] {
        self.stages.classes()
    }

    /// Row order is preserved; the class label of each row is the code
    /// of its Frequency_Hz value.
    pub fn encode(&self, records: &[RawRecord]) -> Result<FeatureTable> {
        let mut rows   = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());

        for r in records {
            let stage = self.stages.encode(&r.stage)?;
            let class = self.frequencies.encode(&r.frequency_hz)?;
            rows.push(vec![stage as f64, r.cycle_number, r.stress_mpa, class as f64]);
            labels.push(class);
        }

        let columns      = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let label_column = FEATURE_COLUMNS
            .iter()
            .position(|&c| c == FREQUENCY_CLASS)
            .unwrap_or(FEATURE_COLUMNS.len() - 1);

        FeatureTable::new(columns, rows, labels, label_column, self.num_classes())
    }
}

// ─── MinMaxScaler ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit per-column bounds on every row of the table.
    pub fn fit(table: &FeatureTable) -> Self {
        let n    = table.feature_count();
        let mut mins = vec![f64::INFINITY; n];
        let mut maxs = vec![f64::NEG_INFINITY; n];
        for row in table.rows() {
            for (c, &v) in row.iter().enumerate() {
                mins[c] = mins[c].min(v);
                maxs[c] = maxs[c].max(v);
            }
        }
        Self { mins, maxs }
    }

    pub fn transform(&self, mut table: FeatureTable) -> Result<FeatureTable> {
        if table.feature_count() != self.mins.len() {
            return Err(PipelineError::config(format!(
                "scaler fit on {} columns, table has {}",
                self.mins.len(),
                table.feature_count()
            )));
        }
        for row in 0..table.row_count() {
            for col in 0..self.mins.len() {
                let v = table.rows()[row][col];
                table.set_value(row, col, self.scale(col, v));
            }
        }
        Ok(table)
    }

    pub fn fit_transform(table: FeatureTable) -> Result<(Self, FeatureTable)> {
        let scaler = Self::fit(&table);
        let table  = scaler.transform(table)?;
        Ok((scaler, table))
    }

    fn scale(&self, col: usize, v: f64) -> f64 {
        let range = self.maxs[col] - self.mins[col];
        if range > 0.0 { (v - self.mins[col]) / range } else { 0.0 }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RawRecord> {
        vec![
            RawRecord::new("Propagation", 10.0, 1.0, 200.0),
            RawRecord::new("Initiation",  10.0, 2.0, 210.0),
            RawRecord::new("Initiation",  30.0, 1.0, 300.0),
            RawRecord::new("Failure",     20.0, 1.0, 400.0),
        ]
    }

    #[test]
    fn test_codes_follow_sorted_order() {
        let enc = FeatureEncoder::fit(&records());
        assert_eq!(enc.stages(), &["Failure", "Initiation", "Propagation"]);
        assert_eq!(enc.frequencies(), &[10.0, 20.0, 30.0]);
        assert_eq!(enc.num_classes(), 3);

        let table = enc.encode(&records()).unwrap();
        assert_eq!(table.labels(), &[0, 0, 2, 1]);
        assert_eq!(table.rows()[0], vec![2.0, 1.0, 200.0, 0.0]);
        assert_eq!(table.rows()[3], vec![0.0, 1.0, 400.0, 1.0]);
    }

    #[test]
    fn test_unseen_value_is_an_encoding_error() {
        let enc    = FeatureEncoder::fit(&records());
        let unseen = vec![RawRecord::new("Unknown", 10.0, 1.0, 1.0)];
        let err    = enc.encode(&unseen).unwrap_err();
        assert!(matches!(err, PipelineError::Encoding { ref column, .. } if column == "Stage"));
    }

    #[test]
    fn test_min_max_scales_into_unit_range() {
        let table       = FeatureEncoder::fit(&records()).encode(&records()).unwrap();
        let (_, scaled) = MinMaxScaler::fit_transform(table).unwrap();
        for row in scaled.rows() {
            for &v in row {
                assert!((0.0..=1.0).contains(&v), "value {v} outside [0, 1]");
            }
        }
        // Stress 200..400 → 0, 0.05, 0.5, 1
        let stress = scaled.column(2);
        assert_eq!(stress, vec![0.0, 0.05, 0.5, 1.0]);
        // Labels are untouched by scaling
        assert_eq!(scaled.labels(), &[0, 0, 2, 1]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let recs = vec![
            RawRecord::new("A", 10.0, 5.0, 1.0),
            RawRecord::new("A", 20.0, 5.0, 2.0),
        ];
        let table       = FeatureEncoder::fit(&recs).encode(&recs).unwrap();
        let (_, scaled) = MinMaxScaler::fit_transform(table).unwrap();
        assert_eq!(scaled.column(0), vec![0.0, 0.0]);
        assert_eq!(scaled.column(1), vec![0.0, 0.0]);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = FeatureEncoder::fit(&records()).encode(&records()).unwrap();
        let b = FeatureEncoder::fit(&records()).encode(&records()).unwrap();
        let (_, a) = MinMaxScaler::fit_transform(a).unwrap();
        let (_, b) = MinMaxScaler::fit_transform(b).unwrap();
        let bits = |t: &FeatureTable| -> Vec<u64> {
            t.rows().iter().flatten().map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }
}
