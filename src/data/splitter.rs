// ============================================================
// Layer 4 - Stratified Split Builder
// ============================================================
// Partitions windows into train / validation / test while
// keeping each class's share roughly equal in every split.
//
// Two stages:
//   1. holdout = validation + test, taken from the full set
//   2. test    = test / (validation + test) of the holdout
//
// Per stage:
//   n_holdout    = ⌈fraction × n⌉
//   class quota  = n_c × n_holdout / n, floored; leftover slots go
//                  to the largest fractional parts (ties → lower
//                  class index)
//   which items  = a seeded Fisher-Yates shuffle within each class
//
// Every window lands in exactly one split. Output order within a
// split follows the original window order.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::{PipelineError, Result};
use crate::domain::window::{class_counts, SplitFractions, Splits, Window};

const FRACTION_TOLERANCE: f64 = 1e-6;

pub struct StratifiedSplitter {
    fractions: SplitFractions,
    seed:      u64,
}

impl StratifiedSplitter {
    pub fn new(fractions: SplitFractions, seed: u64) -> Result<Self> {
        let SplitFractions { train, validation, test } = fractions;
        for (name, f) in [("train", train), ("validation", validation), ("test", test)] {
            if !(f > 0.0 && f < 1.0) {
                return Err(PipelineError::config(format!(
                    "{name} fraction must be within (0, 1), got {f}"
                )));
            }
        }
        let sum = train + validation + test;
        if (sum - 1.0).abs() > FRACTION_TOLERANCE {
            return Err(PipelineError::config(format!(
                "split fractions must sum to 1, got {sum}"
            )));
        }
        Ok(Self { fractions, seed })
    }

    pub fn split(&self, windows: Vec<Window>, num_classes: usize) -> Result<Splits> {
        let labels: Vec<usize> = windows.iter().map(|w| w.label).collect();
        let counts             = class_counts(&windows, num_classes);

        // A class needs one window per split at the very least.
        if let Some((class, &count)) = counts.iter().enumerate().find(|&(_, &c)| c > 0 && c < 3) {
            return Err(PipelineError::Stratification {
                class,
                count,
                reason: "at least 3 are needed to cover train, validation and test".into(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let all: Vec<usize> = (0..windows.len()).collect();

        // ── Stage 1: train vs holdout ─────────────────────────────────────────
        let holdout_fraction = self.fractions.validation + self.fractions.test;
        let (train_idx, holdout_idx) =
            stratified_holdout(&all, &labels, num_classes, holdout_fraction, &mut rng);

        // ── Stage 2: validation vs test within the holdout ────────────────────
        let test_fraction = self.fractions.test / holdout_fraction;
        let (val_idx, test_idx) =
            stratified_holdout(&holdout_idx, &labels, num_classes, test_fraction, &mut rng);

        for (name, idx) in [("train", &train_idx), ("validation", &val_idx), ("test", &test_idx)] {
            let present = presence(idx, &labels, num_classes);
            if let Some(class) = (0..num_classes).find(|&c| counts[c] > 0 && !present[c]) {
                return Err(PipelineError::Stratification {
                    class,
                    count: counts[class],
                    reason: format!("none would land in the {name} split"),
                });
            }
        }

        // ── Move windows into their split ─────────────────────────────────────
        let mut assignment = vec![0u8; windows.len()];
        for &i in &val_idx {
            assignment[i] = 1;
        }
        for &i in &test_idx {
            assignment[i] = 2;
        }
        let mut splits = Splits::default();
        for (window, slot) in windows.into_iter().zip(assignment) {
            match slot {
                0 => splits.train.push(window),
                1 => splits.validation.push(window),
                _ => splits.test.push(window),
            }
        }

        tracing::info!(
            "Stratified split of {} windows: {} train, {} validation, {} test",
            splits.total(),
            splits.train.len(),
            splits.validation.len(),
            splits.test.len(),
        );
        tracing::debug!(
            "Class counts - all {:?} | train {:?} | validation {:?} | test {:?}",
            counts,
            class_counts(&splits.train, num_classes),
            class_counts(&splits.validation, num_classes),
            class_counts(&splits.test, num_classes),
        );
        Ok(splits)
    }
}

/// Split `indices` into (keep, holdout) with per-class proportional quotas.
/// Both outputs are sorted ascending.
fn stratified_holdout(
    indices:     &[usize],
    labels:      &[usize],
    num_classes: usize,
    fraction:    f64,
    rng:         &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let n = indices.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let n_holdout = ((fraction * n as f64) - 1e-9).ceil().clamp(0.0, n as f64) as usize;

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); num_classes];
    for &i in indices {
        by_class[labels[i]].push(i);
    }

    let quotas = largest_remainder(
        &by_class.iter().map(|v| v.len()).collect::<Vec<_>>(),
        n_holdout,
    );

    let mut keep    = Vec::with_capacity(n - n_holdout);
    let mut holdout = Vec::with_capacity(n_holdout);
    for (members, quota) in by_class.iter_mut().zip(quotas) {
        members.shuffle(rng);
        holdout.extend_from_slice(&members[..quota]);
        keep.extend_from_slice(&members[quota..]);
    }
    keep.sort_unstable();
    holdout.sort_unstable();
    (keep, holdout)
}

/// Distribute `total` slots over classes proportionally to `counts`.
fn largest_remainder(counts: &[usize], total: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return vec![0; counts.len()];
    }
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * total as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut left = total.saturating_sub(quotas.iter().sum());
    for &c in order.iter().cycle() {
        if left == 0 {
            break;
        }
        if quotas[c] < counts[c] {
            quotas[c] += 1;
            left -= 1;
        }
    }
    quotas
}

fn presence(indices: &[usize], labels: &[usize], num_classes: usize) -> Vec<bool> {
    let mut present = vec![false; num_classes];
    for &i in indices {
        present[labels[i]] = true;
    }
    present
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn windows(labels: &[usize]) -> Vec<Window> {
        labels
            .iter()
            .enumerate()
            .map(|(start, &label)| Window {
                start,
                seq_len: 1,
                feature_count: 1,
                features: vec![start as f32],
                label,
            })
            .collect()
    }

    fn even_labels(n: usize, k: usize) -> Vec<usize> {
        (0..n).map(|i| i * k / n).collect()
    }

    fn starts(ws: &[Window]) -> HashSet<usize> {
        ws.iter().map(|w| w.start).collect()
    }

    fn splitter(seed: u64) -> StratifiedSplitter {
        StratifiedSplitter::new(SplitFractions::default(), seed).unwrap()
    }

    #[test]
    fn test_splits_form_a_partition() {
        let s = splitter(42).split(windows(&even_labels(190, 3)), 3).unwrap();
        let (tr, va, te) = (starts(&s.train), starts(&s.validation), starts(&s.test));
        assert!(tr.is_disjoint(&va));
        assert!(tr.is_disjoint(&te));
        assert!(va.is_disjoint(&te));
        let union: HashSet<usize> = tr.union(&va).chain(te.iter()).copied().collect();
        assert_eq!(union, (0..190).collect());
        assert_eq!(s.total(), 190);
    }

    #[test]
    fn test_sizes_for_190_windows() {
        let s = splitter(42).split(windows(&even_labels(190, 3)), 3).unwrap();
        assert!((132..=134).contains(&s.train.len()), "train {}", s.train.len());
        assert!((18..=20).contains(&s.validation.len()), "validation {}", s.validation.len());
        assert!((37..=39).contains(&s.test.len()), "test {}", s.test.len());
    }

    #[test]
    fn test_class_proportions_are_preserved() {
        // Uneven classes: 50% / 30% / 20%
        let labels: Vec<usize> = (0..2000)
            .map(|i| if i < 1000 { 0 } else if i < 1600 { 1 } else { 2 })
            .collect();
        let s = splitter(7).split(windows(&labels), 3).unwrap();
        let overall = [0.5, 0.3, 0.2];
        for split in [&s.train, &s.validation, &s.test] {
            let counts = class_counts(split, 3);
            for c in 0..3 {
                let share = counts[c] as f64 / split.len() as f64;
                assert!(
                    (share - overall[c]).abs() <= 0.02,
                    "class {c} share {share} deviates from {}",
                    overall[c]
                );
            }
        }
    }

    #[test]
    fn test_per_class_counts_within_rounding() {
        let labels = even_labels(190, 3);
        let s      = splitter(3).split(windows(&labels), 3).unwrap();
        let all    = class_counts(&windows(&labels), 3);
        for (split, fraction) in [(&s.train, 0.7), (&s.validation, 0.1), (&s.test, 0.2)] {
            let counts = class_counts(split, 3);
            for c in 0..3 {
                let expected = all[c] as f64 * fraction;
                assert!((counts[c] as f64 - expected).abs() <= 2.0);
            }
        }
    }

    #[test]
    fn test_same_seed_same_split() {
        let labels = even_labels(300, 4);
        let a = splitter(11).split(windows(&labels), 4).unwrap();
        let b = splitter(11).split(windows(&labels), 4).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        let c = splitter(12).split(windows(&labels), 4).unwrap();
        assert_ne!(starts(&a.test), starts(&c.test));
    }

    #[test]
    fn test_tiny_class_is_a_stratification_error() {
        let mut labels = even_labels(100, 2);
        labels[0] = 2; // class 2 has a single window
        let err = splitter(1).split(windows(&labels), 3).unwrap_err();
        assert!(matches!(err, PipelineError::Stratification { class: 2, count: 1, .. }));
    }

    #[test]
    fn test_class_too_small_for_validation_is_a_stratification_error() {
        // Class 1 has 4 of 200 windows: its validation quota rounds to zero.
        let labels: Vec<usize> = (0..200).map(|i| if i < 4 { 1 } else { 0 }).collect();
        let err = splitter(5).split(windows(&labels), 2).unwrap_err();
        assert!(matches!(err, PipelineError::Stratification { class: 1, .. }));
    }

    #[test]
    fn test_invalid_fractions_are_rejected() {
        let bad = SplitFractions { train: 0.7, validation: 0.2, test: 0.2 };
        assert!(StratifiedSplitter::new(bad, 0).is_err());
        let zero = SplitFractions { train: 0.8, validation: 0.0, test: 0.2 };
        assert!(StratifiedSplitter::new(zero, 0).is_err());
    }

    #[test]
    fn test_largest_remainder_hits_total() {
        assert_eq!(largest_remainder(&[63, 63, 64], 57), vec![19, 19, 19]);
        assert_eq!(largest_remainder(&[5, 5], 3).iter().sum::<usize>(), 3);
        assert_eq!(largest_remainder(&[0, 10], 4), vec![0, 4]);
    }
}
