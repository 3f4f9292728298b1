// ============================================================
// Layer 4 - Window Dataset
// ============================================================
// Wraps one split's windows behind Burn's Dataset trait so the
// DataLoader can index them. Pure view: values are never changed.
// The windows sit behind an Arc, so handing the same split to
// several loaders (one per epoch, or trainer + evaluator) does
// not copy them.

use std::sync::Arc;

use burn::data::dataset::Dataset;

use crate::domain::window::{class_counts, Window};

#[derive(Debug, Clone)]
pub struct WindowDataset {
    windows:       Arc<Vec<Window>>,
    seq_len:       usize,
    feature_count: usize,
}

impl WindowDataset {
    pub fn new(windows: Vec<Window>, seq_len: usize, feature_count: usize) -> Self {
        debug_assert!(windows
            .iter()
            .all(|w| w.seq_len == seq_len && w.feature_count == feature_count));
        Self { windows: Arc::new(windows), seq_len, feature_count }
    }

    pub fn sample_count(&self) -> usize {
        self.windows.len()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        class_counts(&self.windows, num_classes)
    }
}

impl Dataset<Window> for WindowDataset {
    fn get(&self, index: usize) -> Option<Window> {
        self.windows.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.windows.len()
    }
}
