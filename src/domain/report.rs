// ============================================================
// Layer 3 - Classification Report
// ============================================================
// Derived from (true label, predicted label) pairs only; never
// stored as model state. matrix[t][p] counts samples of true
// class t predicted as p.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis labels for a K-class problem.
pub fn class_names(num_classes: usize) -> Vec<String> {
    if num_classes == 2 {
        vec!["Negative".to_string(), "Positive".to_string()]
    } else {
        (0..num_classes).map(|c| c.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build a K×K matrix. Pairs with an out-of-range class are ignored.
    pub fn from_pairs(y_true: &[usize], y_pred: &[usize], num_classes: usize) -> Self {
        let mut matrix = vec![vec![0usize; num_classes]; num_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < num_classes && p < num_classes {
                matrix[t][p] += 1;
            }
        }
        Self { labels: class_names(num_classes), matrix }
    }

    pub fn n_classes(&self) -> usize {
        self.matrix.len()
    }

    pub fn get(&self, true_label: usize, predicted_label: usize) -> usize {
        self.matrix[true_label][predicted_label]
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.get(class, class)
    }

    /// Column sum: everything predicted as `class`.
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Row sum: everything that truly is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|c| self.true_positives(c)).sum();
        correct as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|l| l.len())
            .max()
            .unwrap_or(1)
            .max(9);

        write!(f, "{:>width$} ", "true\\pred")?;
        for label in &self.labels {
            write!(f, "{label:>width$} ")?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.matrix) {
            write!(f, "{label:>width$} ")?;
            for count in row {
                write!(f, "{count:>width$} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub name:      String,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy:     f64,
    pub per_class:    Vec<ClassMetrics>,
    pub macro_avg:    AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion:    ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic(p: f64, r: f64) -> f64 {
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

impl ClassificationReport {
    pub fn from_pairs(y_true: &[usize], y_pred: &[usize], num_classes: usize) -> Self {
        let confusion = ConfusionMatrix::from_pairs(y_true, y_pred, num_classes);

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|c| {
                let tp        = confusion.true_positives(c);
                let precision = ratio(tp, confusion.predicted(c));
                let recall    = ratio(tp, confusion.support(c));
                ClassMetrics {
                    name: confusion.labels[c].clone(),
                    precision,
                    recall,
                    f1: harmonic(precision, recall),
                    support: confusion.support(c),
                }
            })
            .collect();

        let k = num_classes.max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / k,
            recall:    per_class.iter().map(|m| m.recall).sum::<f64>() / k,
            f1:        per_class.iter().map(|m| m.f1).sum::<f64>() / k,
        };

        let total = confusion.total();
        let weighted = |get: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class.iter().map(|m| get(m) * m.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall:    weighted(|m| m.recall),
            f1:        weighted(|m| m.f1),
        };

        Self {
            accuracy: confusion.accuracy(),
            per_class,
            macro_avg,
            weighted_avg,
            confusion,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f, "{}", "-".repeat(56))?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                m.name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "{}", "-".repeat(56))?;
        let total = self.confusion.total();
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                name, avg.precision, avg.recall, avg.f1, total
            )?;
        }
        writeln!(f, "\nAccuracy: {:.4}\n", self.accuracy)?;
        write!(f, "{}", self.confusion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_labels_are_named() {
        let cm = ConfusionMatrix::from_pairs(&[0, 1], &[0, 1], 2);
        assert_eq!(cm.labels, vec!["Negative", "Positive"]);
        let cm = ConfusionMatrix::from_pairs(&[0, 2], &[0, 1], 3);
        assert_eq!(cm.labels, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_matrix_counts_true_by_predicted() {
        let y_true = [0, 1, 0, 2, 1];
        let y_pred = [0, 1, 1, 2, 0];
        let cm     = ConfusionMatrix::from_pairs(&y_true, &y_pred, 3);
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 0), 1);
        assert_eq!(cm.total(), 5);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_report_precision_recall_f1() {
        // class 0: tp=2 fp=1 fn=0 ; class 1: tp=1 fp=0 fn=1
        let y_true = [0, 0, 1, 1];
        let y_pred = [0, 0, 0, 1];
        let r      = ClassificationReport::from_pairs(&y_true, &y_pred, 2);

        assert!((r.per_class[0].precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((r.per_class[0].recall - 1.0).abs() < 1e-12);
        assert!((r.per_class[1].precision - 1.0).abs() < 1e-12);
        assert!((r.per_class[1].recall - 0.5).abs() < 1e-12);
        assert!((r.per_class[0].f1 - 0.8).abs() < 1e-12);
        assert_eq!(r.per_class[1].support, 2);
        assert!((r.accuracy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_absent_class_scores_zero() {
        let r = ClassificationReport::from_pairs(&[0, 0], &[0, 0], 3);
        assert_eq!(r.per_class[2].precision, 0.0);
        assert_eq!(r.per_class[2].recall, 0.0);
        assert_eq!(r.per_class[2].f1, 0.0);
        assert_eq!(r.per_class[2].support, 0);
    }

    #[test]
    fn test_display_contains_accuracy_and_matrix() {
        let r    = ClassificationReport::from_pairs(&[0, 1], &[0, 1], 2);
        let text = r.to_string();
        assert!(text.contains("Accuracy: 1.0000"));
        assert!(text.contains("Positive"));
    }
}
