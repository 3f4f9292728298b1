// ============================================================
// Layer 4 - Window Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N windows into
//
//   sequences: [N, seq_len, feature_count]   (float)
//   targets:   [N]                           (int)
//
// Every window has the same shape, so batching is a flat copy
// followed by a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::data::dataset::WindowDataset;
use crate::domain::window::Window;

#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    pub sequences: Tensor<B, 3>,
    pub targets:   Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Window, WindowBatch<B>> for WindowBatcher<B> {
    fn batch(&self, items: Vec<Window>) -> WindowBatch<B> {
        let batch_size    = items.len();
        let seq_len       = items[0].seq_len;
        let feature_count = items[0].feature_count;

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|w| w.features.iter().copied())
            .collect();
        let labels: Vec<i32> = items.iter().map(|w| w.label as i32).collect();

        let sequences = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len, feature_count]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        WindowBatch { sequences, targets }
    }
}

/// Batch iterator over one split.
///
/// With `shuffle_seed` set, every call to `iter()` on the returned loader
/// walks the windows in a fresh order drawn from a generator seeded once
/// here, so epoch orders differ but the whole sequence of epochs is
/// reproducible. Without it, batches follow split order on every pass.
pub fn window_loader<B: Backend>(
    dataset:      WindowDataset,
    batch_size:   usize,
    shuffle_seed: Option<u64>,
    device:       B::Device,
) -> Arc<dyn DataLoader<WindowBatch<B>>> {
    let builder = DataLoaderBuilder::new(WindowBatcher::<B>::new(device)).batch_size(batch_size);
    let builder = match shuffle_seed {
        Some(seed) => builder.shuffle(seed),
        None       => builder,
    };
    builder.build(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn dataset(n: usize) -> WindowDataset {
        let ws = (0..n)
            .map(|i| Window {
                start:         i,
                seq_len:       3,
                feature_count: 2,
                features:      (0..6).map(|j| (i * 10 + j) as f32).collect(),
                label:         i % 3,
            })
            .collect();
        WindowDataset::new(ws, 3, 2)
    }

    fn targets(batch: &WindowBatch<TestBackend>) -> Vec<i64> {
        batch.targets.clone().into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = WindowBatcher::<TestBackend>::new(Default::default());
        let ds      = dataset(4);
        let batch   = batcher.batch(ds.windows().to_vec());
        assert_eq!(batch.sequences.dims(), [4, 3, 2]);
        assert_eq!(targets(&batch), vec![0, 1, 2, 0]);

        let values: Vec<f32> = batch.sequences.into_data().iter::<f32>().collect();
        // window 1, step 2, feature 1 → 10 + 5
        assert_eq!(values[6 + 2 * 2 + 1], 15.0);
    }

    #[test]
    fn test_unshuffled_loader_keeps_split_order_across_passes() {
        let loader = window_loader::<TestBackend>(dataset(10), 4, None, Default::default());
        let pass   = || loader.iter().flat_map(|b| targets(&b)).collect::<Vec<_>>();
        let first  = pass();
        assert_eq!(first, (0..10).map(|i| (i % 3) as i64).collect::<Vec<_>>());
        assert_eq!(first, pass());
    }

    #[test]
    fn test_last_partial_batch_is_kept() {
        let loader = window_loader::<TestBackend>(dataset(10), 4, None, Default::default());
        let sizes: Vec<usize> = loader.iter().map(|b| b.sequences.dims()[0]).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_shuffled_loader_covers_every_window_each_pass() {
        let loader = window_loader::<TestBackend>(dataset(30), 8, Some(42), Default::default());
        let starts = || {
            let mut firsts: Vec<i64> = loader
                .iter()
                .flat_map(|b| {
                    let [n, s, f] = b.sequences.dims();
                    let values: Vec<f32> = b.sequences.into_data().iter::<f32>().collect();
                    (0..n).map(move |i| (values[i * s * f] / 10.0) as i64).collect::<Vec<_>>()
                })
                .collect();
            let order = firsts.clone();
            firsts.sort_unstable();
            (order, firsts)
        };
        let (order_a, sorted_a) = starts();
        let (order_b, sorted_b) = starts();
        assert_eq!(sorted_a, (0..30).collect::<Vec<_>>());
        assert_eq!(sorted_b, (0..30).collect::<Vec<_>>());
        assert_ne!(order_a, order_b, "each pass should draw a new order");
    }
}
