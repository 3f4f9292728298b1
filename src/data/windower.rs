// ============================================================
// Layer 4 - Sequence Windower
// ============================================================
// Turns the row-ordered feature table into overlapping windows
// of `seq_len` rows. Each window is labelled with the class of
// the row immediately after it:
//
//   window i = rows[i .. i + seq_len]  →  labels[i + seq_len]
//
// Stride is 1, so n rows give exactly n - seq_len windows and
// neighbours share seq_len - 1 rows. The last row of the table
// only ever serves as a label.

use crate::domain::error::{PipelineError, Result};
use crate::domain::record::FeatureTable;
use crate::domain::window::Window;

pub struct SequenceWindower {
    seq_len: usize,
}

impl SequenceWindower {
    pub fn new(seq_len: usize) -> Result<Self> {
        if seq_len == 0 {
            return Err(PipelineError::config("seq_len must be at least 1"));
        }
        Ok(Self { seq_len })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn windows(&self, table: &FeatureTable) -> Result<Vec<Window>> {
        self.windows_from(table.rows(), table.labels())
    }

    /// Build windows from a row-major matrix and a parallel label vector.
    pub fn windows_from(&self, rows: &[Vec<f64>], labels: &[usize]) -> Result<Vec<Window>> {
        let n = rows.len();
        if labels.len() != n {
            return Err(PipelineError::config(format!(
                "{n} feature rows but {} labels",
                labels.len()
            )));
        }
        if n <= self.seq_len {
            return Err(PipelineError::config(format!(
                "{n} rows are not enough for seq_len={} (need at least {})",
                self.seq_len,
                self.seq_len + 1
            )));
        }
        let feature_count = rows[0].len();

        let windows: Vec<Window> = (0..n - self.seq_len)
            .map(|start| {
                let features = rows[start..start + self.seq_len]
                    .iter()
                    .flat_map(|row| row.iter().map(|&v| v as f32))
                    .collect();
                Window {
                    start,
                    seq_len: self.seq_len,
                    feature_count,
                    features,
                    label: labels[start + self.seq_len],
                }
            })
            .collect();

        tracing::info!(
            "Built {} windows of {}×{} from {} rows",
            windows.len(),
            self.seq_len,
            feature_count,
            n
        );
        Ok(windows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// Row i holds [i, 1000 + i] so every value identifies its row.
    fn rows(n: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let rows   = (0..n).map(|i| vec![i as f64, 1000.0 + i as f64]).collect();
        let labels = (0..n).map(|i| i % 3).collect();
        (rows, labels)
    }

    #[test]
    fn test_window_count_is_rows_minus_seq_len() {
        for (n, seq_len) in [(200, 10), (11, 10), (50, 1), (7, 6)] {
            let (r, l) = rows(n);
            let w      = SequenceWindower::new(seq_len).unwrap().windows_from(&r, &l).unwrap();
            assert_eq!(w.len(), n - seq_len);
        }
    }

    #[test]
    fn test_label_comes_from_the_following_row() {
        let (r, l) = rows(30);
        let w      = SequenceWindower::new(5).unwrap().windows_from(&r, &l).unwrap();
        for (i, win) in w.iter().enumerate() {
            assert_eq!(win.start, i);
            assert_eq!(win.label, l[i + 5]);
        }
    }

    #[test]
    fn test_no_value_from_the_label_row_leaks_into_the_window() {
        let (r, l) = rows(40);
        let w      = SequenceWindower::new(10).unwrap().windows_from(&r, &l).unwrap();
        for win in &w {
            let label_row: Vec<f32> = r[win.start + win.seq_len].iter().map(|&v| v as f32).collect();
            for step in 0..win.seq_len {
                assert_eq!(win.step(step), r[win.start + step].iter().map(|&v| v as f32).collect::<Vec<_>>().as_slice());
                assert_ne!(win.step(step), label_row.as_slice());
            }
            assert!(!win.features.contains(&label_row[0]));
        }
    }

    #[test]
    fn test_neighbours_overlap_by_seq_len_minus_one() {
        let (r, l) = rows(20);
        let w      = SequenceWindower::new(4).unwrap().windows_from(&r, &l).unwrap();
        let f      = w[0].feature_count;
        assert_eq!(&w[0].features[f..], &w[1].features[..3 * f]);
    }

    #[test]
    fn test_too_few_rows_is_a_configuration_error() {
        let (r, l) = rows(10);
        let err    = SequenceWindower::new(10).unwrap().windows_from(&r, &l);
        assert!(matches!(err, Err(PipelineError::Configuration(_))));
        assert!(SequenceWindower::new(0).is_err());
    }
}
