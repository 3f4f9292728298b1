// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Re-scores a saved checkpoint without training:
//
//   Step 1: Read <name>.config.json      (Layer 6 - infra)
//   Step 2: Rebuild windows and splits   (Layer 4 - data)
//   Step 3: Build the same classifier    (Layer 5 - ml)
//   Step 4: Load the best weights        (Layer 6 - infra)
//   Step 5: Evaluate the chosen split    (Layer 5 - ml)
//
// The pipeline is deterministic for a given config, so the
// rebuilt splits are the ones the checkpoint was trained on.

use anyhow::{Context, Result};
use burn::{backend::NdArray, prelude::*};
use std::path::PathBuf;

#[cfg(not(feature = "wgpu"))]
use crate::application::train_use_case::gpu_unavailable;
use crate::application::train_use_case::{prepare_data, ComputeDevice, ExperimentConfig, PreparedData};
use crate::data::{dataset::WindowDataset, loader::CsvLoader};
use crate::domain::window::SplitKind;
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::{
    evaluator::{evaluate, Evaluation},
    model::{ClassifierBuilder, ClassifierKind},
};

/// Load the stored best weights into a fresh `builder` model and
/// evaluate it on `dataset` in inference mode.
pub fn evaluate_checkpoint<B: Backend, C: ClassifierBuilder>(
    builder:    &C,
    store:      &CheckpointStore,
    dataset:    WindowDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Evaluation> {
    let model = store
        .load_model::<B, _>(builder.build::<B>(device), device)
        .context("stage: checkpoint store")?;
    evaluate::<B, _>(&model, dataset, batch_size, device).context("stage: evaluator")
}

#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub config:     ExperimentConfig,
    pub split:      SplitKind,
    pub evaluation: Evaluation,
}

pub struct EvaluateUseCase {
    checkpoint_dir:  PathBuf,
    checkpoint_name: String,
    split:           SplitKind,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, checkpoint_name: impl Into<String>, split: SplitKind) -> Self {
        Self {
            checkpoint_dir:  checkpoint_dir.into(),
            checkpoint_name: checkpoint_name.into(),
            split,
        }
    }

    pub fn execute(&self) -> Result<EvaluationSummary> {
        // ── Step 1: Config saved by `train` ───────────────────────────────────
        let store = CheckpointStore::open(&self.checkpoint_dir, &self.checkpoint_name)
            .context("stage: checkpoint store")?;
        let config: ExperimentConfig = store
            .load_config()
            .context("stage: checkpoint store (run `train` first)")?;
        tracing::info!(
            "Evaluating '{}' ({} classifier) on the {} split",
            store.name(),
            config.classifier,
            self.split
        );

        // ── Step 2: Same windows, same splits ─────────────────────────────────
        let data = prepare_data(&config, &CsvLoader::new(&config.data))?;

        // ── Steps 3-5 ─────────────────────────────────────────────────────────
        let evaluation = match config.device {
            ComputeDevice::Cpu => self.run_on::<NdArray>(&config, &data, &store, &Default::default())?,
            #[cfg(feature = "wgpu")]
            ComputeDevice::Gpu => self.run_on::<burn::backend::Wgpu>(&config, &data, &store, &Default::default())?,
            #[cfg(not(feature = "wgpu"))]
            ComputeDevice::Gpu => return Err(gpu_unavailable()),
        };

        Ok(EvaluationSummary { config, split: self.split, evaluation })
    }

    fn run_on<B: Backend>(
        &self,
        config: &ExperimentConfig,
        data:   &PreparedData,
        store:  &CheckpointStore,
        device: &B::Device,
    ) -> Result<Evaluation> {
        let dataset = data.dataset(self.split);
        match config.classifier {
            ClassifierKind::Windowed => evaluate_checkpoint::<B, _>(
                &config.windowed_config(data), store, dataset, config.batch_size, device,
            ),
            ClassifierKind::Recurrent => evaluate_checkpoint::<B, _>(
                &config.recurrent_config(data), store, dataset, config.batch_size, device,
            ),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{tests::synthetic_records, TrainUseCase};
    use std::io::Write;

    /// Writes the rows as CSV, with an extra Strain column the loader drops.
    fn write_csv(path: &std::path::Path, n: usize, k: usize) {
        let mut f = std::fs::File::create(path).unwrap();
        writeln!(f, "Stage,Frequency_Hz,Cycle_Number,Stress_MPa,Strain").unwrap();
        for r in synthetic_records(n, k) {
            writeln!(
                f,
                "{},{},{},{},{}",
                r.stage, r.frequency_hz, r.cycle_number, r.stress_mpa, r.stress_mpa / 1e5
            )
            .unwrap();
        }
    }

    fn config(dir: &std::path::Path) -> ExperimentConfig {
        let data = dir.join("fatigue.csv");
        write_csv(&data, 200, 3);
        ExperimentConfig {
            data,
            checkpoint_dir: dir.join("checkpoints"),
            max_epochs:     Some(4),
            batch_size:     32,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_reproduces_the_training_run() {
        let dir    = tempfile::tempdir().unwrap();
        let cfg    = config(dir.path());
        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();

        // Test split: same confusion matrix as the training report
        let test = EvaluateUseCase::new(&cfg.checkpoint_dir, "best_windowed", SplitKind::Test)
            .execute()
            .unwrap();
        assert_eq!(test.evaluation.report().confusion, report.test.confusion);

        // Validation split: same loss as recorded for the best epoch
        let val = EvaluateUseCase::new(&cfg.checkpoint_dir, "best_windowed", SplitKind::Validation)
            .execute()
            .unwrap();
        assert!(
            (val.evaluation.mean_loss - report.best_val_loss).abs() < 1e-6,
            "reloaded {} vs recorded {}",
            val.evaluation.mean_loss,
            report.best_val_loss
        );
    }

    #[test]
    fn test_unknown_checkpoint_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let err = EvaluateUseCase::new(dir.path(), "missing", SplitKind::Test)
            .execute()
            .unwrap_err();
        assert!(format!("{err:#}").contains("stage: checkpoint store"));
    }
}
