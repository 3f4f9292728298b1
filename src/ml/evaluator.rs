// ============================================================
// Layer 5 - Evaluator
// ============================================================
// One in-order pass over a split with a model in inference mode.
// Collects (true, predicted) pairs plus the mean cross-entropy;
// everything else (accuracy, per-class scores, confusion matrix)
// is derived from those pairs.
//
// The caller decides the model's mode: pass the inner-backend
// model (`model.valid()`) so dropout is off and BatchNorm uses
// its running statistics.

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};

use crate::data::{batcher::window_loader, dataset::WindowDataset};
use crate::domain::error::{PipelineError, Result};
use crate::domain::report::ClassificationReport;
use crate::ml::model::SequenceClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub targets:     Vec<usize>,
    pub predictions: Vec<usize>,
    /// Sample-weighted mean cross-entropy
    pub mean_loss:   f64,
    pub num_classes: usize,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        if self.targets.is_empty() {
            return 0.0;
        }
        let correct = self
            .targets
            .iter()
            .zip(&self.predictions)
            .filter(|(t, p)| t == p)
            .count();
        correct as f64 / self.targets.len() as f64
    }

    pub fn report(&self) -> ClassificationReport {
        ClassificationReport::from_pairs(&self.targets, &self.predictions, self.num_classes)
    }
}

pub fn evaluate<B: Backend, M: SequenceClassifier<B>>(
    model:      &M,
    dataset:    WindowDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Evaluation> {
    if dataset.sample_count() == 0 {
        return Err(PipelineError::config("cannot evaluate an empty split"));
    }

    let loader  = window_loader::<B>(dataset, batch_size, None, device.clone());
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut targets     = Vec::new();
    let mut predictions = Vec::new();
    let mut loss_sum    = 0.0f64;

    for batch in loader.iter() {
        let n      = batch.targets.dims()[0];
        let logits = model.forward(batch.sequences);

        let batch_loss: f64 = loss_fn
            .forward(logits.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        loss_sum += batch_loss * n as f64;

        // argmax(1) returns shape [batch, 1], flatten to [batch]
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        predictions.extend(predicted.into_data().iter::<i64>().map(|p| p as usize));
        targets.extend(batch.targets.into_data().iter::<i64>().map(|t| t as usize));
    }

    let mean_loss = loss_sum / targets.len() as f64;
    tracing::debug!("Evaluated {} windows, mean loss {:.6}", targets.len(), mean_loss);

    Ok(Evaluation {
        targets,
        predictions,
        mean_loss,
        num_classes: model.num_classes(),
    })
}
