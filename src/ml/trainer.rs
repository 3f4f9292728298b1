// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Model-agnostic train / validate / early-stop loop using Burn's
// DataLoader and Adam. Works for any SequenceClassifier.
//
// Per epoch:
//   1. training pass   - shuffled batches, Adam step per batch
//   2. validation pass - model.valid() on the inner backend,
//                        split order, no parameter updates
//   3. decision        - strictly better val loss → overwrite the
//                        best checkpoint; otherwise count towards
//                        patience and stop once it is reached
//
// Key Burn insight:
//   - Training uses the Autodiff backend for gradients
//   - model.valid() returns the model on the inner backend, where
//     dropout is off and BatchNorm uses running statistics
//
// Any NaN/Inf loss aborts the run with OptimizationDiverged.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{batcher::window_loader, dataset::WindowDataset};
use crate::domain::error::{PipelineError, Result};
use crate::infra::checkpoint::CheckpointStore;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::early_stopping::{EarlyStopping, Progress, StopReason};
use crate::ml::evaluator::evaluate;
use crate::ml::model::SequenceClassifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub max_epochs:    usize,
    pub patience:      usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    /// Seeds the per-epoch shuffle order of the training batches
    pub seed:          u64,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 {
            return Err(PipelineError::config("max_epochs must be at least 1"));
        }
        if self.patience == 0 {
            return Err(PipelineError::config("early_stop_patience must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::config("batch_size must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::config(format!(
                "learning_rate must be a positive finite value, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub epochs_run:    usize,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub stop_reason:   StopReason,
    pub history:       Vec<EpochMetrics>,
}

/// Train `model` and keep its best state in `store`.
///
/// The returned outcome describes the run; the best weights are only
/// on disk; load them with `CheckpointStore::load_model`.
pub fn train<B, M>(
    mut model: M,
    train_set: WindowDataset,
    valid_set: WindowDataset,
    cfg:       &TrainingConfig,
    store:     &CheckpointStore,
    device:    &B::Device,
) -> Result<TrainingOutcome>
where
    B: AutodiffBackend,
    M: SequenceClassifier<B> + AutodiffModule<B>,
    M::InnerModule: SequenceClassifier<B::InnerBackend>,
{
    cfg.validate()?;
    if train_set.sample_count() == 0 {
        return Err(PipelineError::config("training split is empty"));
    }
    tracing::info!(
        "Training on {} windows of {}×{} (class counts {:?}), validating on {}",
        train_set.sample_count(),
        train_set.seq_len(),
        train_set.feature_count(),
        train_set.class_counts(model.num_classes()),
        valid_set.sample_count(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().init::<B, M>();
    let loss_fn   = CrossEntropyLossConfig::new().init(device);

    // ── Training data loader (reshuffled on every pass) ───────────────────────
    let train_loader = window_loader::<B>(train_set, cfg.batch_size, Some(cfg.seed), device.clone());

    let mut metrics  = MetricsLogger::create(store.metrics_path())?;
    tracing::debug!("Epoch metrics go to '{}'", metrics.csv_path().display());
    let mut stopper  = EarlyStopping::new(cfg.patience);
    let mut history  = Vec::with_capacity(cfg.max_epochs);
    let mut stop     = StopReason::EpochBudgetExhausted;

    tracing::info!(
        "Training for up to {} epochs (patience {}, batch {}, lr {})",
        cfg.max_epochs, cfg.patience, cfg.batch_size, cfg.learning_rate
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.max_epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut seen     = 0usize;

        for (step, batch) in train_loader.iter().enumerate() {
            let n      = batch.targets.dims()[0];
            let logits = model.forward(batch.sequences);
            let loss   = loss_fn.forward(logits, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(PipelineError::OptimizationDiverged {
                    epoch,
                    phase: "training",
                    loss:  loss_val,
                });
            }
            loss_sum += loss_val * n as f64;
            seen     += n;
            tracing::debug!("epoch {} step {}: loss={:.6}", epoch, step + 1, loss_val);

            // Backward pass + Adam update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model     = optim.step(cfg.learning_rate, model, grads);
        }
        let train_loss = loss_sum / seen as f64;

        // ── Validation phase (inner backend, no autodiff) ─────────────────────
        let model_valid = model.valid();
        let eval        = evaluate::<B::InnerBackend, _>(&model_valid, valid_set.clone(), cfg.batch_size, device)?;
        if !eval.mean_loss.is_finite() {
            return Err(PipelineError::OptimizationDiverged {
                epoch,
                phase: "validation",
                loss:  eval.mean_loss,
            });
        }

        // ── Checkpoint / patience decision ────────────────────────────────────
        let progress = stopper.observe(epoch, eval.mean_loss);
        let improved = progress == Progress::Improved;
        if improved {
            store.save_model::<B::InnerBackend, _>(&model_valid)?;
        }

        let row = EpochMetrics {
            epoch,
            train_loss,
            val_loss: eval.mean_loss,
            val_accuracy: eval.accuracy(),
            improved,
        };
        metrics.log(&row)?;
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%{}",
            epoch,
            cfg.max_epochs,
            row.train_loss,
            row.val_loss,
            row.val_accuracy * 100.0,
            if improved { " | best, saved" } else { "" },
        );
        history.push(row);

        if progress == Progress::Stop {
            tracing::info!(
                "Early stopping after epoch {}: no improvement for {} epochs",
                epoch, cfg.patience
            );
            stop = StopReason::EarlyStopped;
            break;
        }
    }

    let best_epoch = stopper.best_epoch().ok_or_else(|| {
        PipelineError::Checkpoint("no epoch produced a checkpoint".to_string())
    })?;
    let outcome = TrainingOutcome {
        epochs_run:    history.len(),
        best_epoch,
        best_val_loss: stopper.best_loss(),
        stop_reason:   stop,
        history,
    };
    tracing::info!(
        "Training finished ({}): {} epochs, best epoch {} with val_loss={:.4}",
        outcome.stop_reason, outcome.epochs_run, outcome.best_epoch, outcome.best_val_loss
    );
    Ok(outcome)
}
