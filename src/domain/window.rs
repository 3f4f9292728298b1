// ============================================================
// Layer 3 - Windows and Splits
// ============================================================
// A Window is `seq_len` consecutive rows of the feature table
// paired with the class of the row right after them:
//
//   rows:   r0 r1 r2 r3 r4 r5 ...
//   window  [r0 r1 r2] -> label(r3)     start = 0
//   window     [r1 r2 r3] -> label(r4)  start = 1
//
// The label row is never part of its own window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One model input: a flattened `seq_len × feature_count` block
/// (row-major) plus the class of row `start + seq_len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start:         usize,
    pub seq_len:       usize,
    pub feature_count: usize,
    pub features:      Vec<f32>,
    pub label:         usize,
}

impl Window {
    /// Feature values of the `step`-th row inside the window.
    pub fn step(&self, step: usize) -> &[f32] {
        let from = step * self.feature_count;
        &self.features[from..from + self.feature_count]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    Train,
    Validation,
    Test,
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitKind::Train      => "train",
            SplitKind::Validation => "validation",
            SplitKind::Test       => "test",
        };
        f.write_str(name)
    }
}

/// Train / validation / test fractions. Must each be positive and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub train:      f64,
    pub validation: f64,
    pub test:       f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self { train: 0.70, validation: 0.10, test: 0.20 }
    }
}

/// The three disjoint window sets of one run.
#[derive(Debug, Clone, Default)]
pub struct Splits {
    pub train:      Vec<Window>,
    pub validation: Vec<Window>,
    pub test:       Vec<Window>,
}

impl Splits {
    pub fn get(&self, kind: SplitKind) -> &[Window] {
        match kind {
            SplitKind::Train      => &self.train,
            SplitKind::Validation => &self.validation,
            SplitKind::Test       => &self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }
}

/// Per-class window counts.
pub fn class_counts(windows: &[Window], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; num_classes];
    for w in windows {
        counts[w.label] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_slices_one_row() {
        let w = Window {
            start:         4,
            seq_len:       2,
            feature_count: 3,
            features:      vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            label:         0,
        };
        assert_eq!(w.step(0), &[1.0, 2.0, 3.0]);
        assert_eq!(w.step(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_split_kind_display() {
        assert_eq!(SplitKind::Validation.to_string(), "validation");
    }
}
