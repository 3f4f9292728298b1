// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one full experiment in order:
//
//   Step 1: Load and sort the table     (Layer 4 - data)
//   Step 2: Encode categorical columns  (Layer 4 - data)
//   Step 3: Inject noise                (Layer 4 - data)
//   Step 4: Min-max scale               (Layer 4 - data)
//   Step 5: Build windows               (Layer 4 - data)
//   Step 6: Stratified 3-way split      (Layer 4 - data)
//   Step 7: Save config                 (Layer 6 - infra)
//   Step 8: Run training loop           (Layer 5 - ml)
//   Step 9: Evaluate best checkpoint    (Layer 5 - ml)
//   Step 10: Save report                (Layer 6 - infra)
//
// Steps 1-6 are shared with the evaluate command through
// `prepare_data`, so both see identical windows and splits.
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::{
    backend::{Autodiff, NdArray},
    module::AutodiffModule,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

use crate::application::evaluate_use_case::evaluate_checkpoint;
use crate::data::{
    dataset::WindowDataset,
    encoder::{FeatureEncoder, MinMaxScaler},
    loader::CsvLoader,
    noise::{NoiseConfig, NoiseInjector},
    splitter::StratifiedSplitter,
    windower::SequenceWindower,
};
use crate::domain::{
    error::PipelineError,
    record::{sort_records, STRESS_MPA},
    report::ClassificationReport,
    traits::TableSource,
    window::{class_counts, SplitFractions, SplitKind, Splits},
};
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::{
    early_stopping::StopReason,
    model::{ClassifierBuilder, ClassifierKind, RecurrentClassifierConfig, WindowedClassifierConfig},
    trainer::{train, TrainingConfig},
};

// ─── Compute device ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    /// burn NdArray backend
    Cpu,
    /// burn Wgpu backend; needs the `wgpu` cargo feature
    Gpu,
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu => write!(f, "cpu"),
            ComputeDevice::Gpu => write!(f, "gpu"),
        }
    }
}

#[cfg(not(feature = "wgpu"))]
pub(crate) fn gpu_unavailable() -> anyhow::Error {
    PipelineError::config("device 'gpu' needs a build with `--features wgpu`").into()
}

// ─── Experiment Configuration ────────────────────────────────────────────────
// Every option of a run. Serialisable so the evaluate command can
// rebuild exactly the same pipeline and classifier from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub data:                 PathBuf,
    pub checkpoint_dir:       PathBuf,
    pub checkpoint_name:      Option<String>,
    pub classifier:           ClassifierKind,
    pub device:               ComputeDevice,
    pub seed:                 u64,
    pub feature_noise_std:    f64,
    pub label_noise_fraction: f64,
    pub noise_columns:        Vec<String>,
    pub seq_len:              usize,
    pub split:                SplitFractions,
    pub batch_size:           usize,
    pub max_epochs:           Option<usize>,
    pub early_stop_patience:  usize,
    pub learning_rate:        f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data:                 PathBuf::from("data/fatigue.csv"),
            checkpoint_dir:       PathBuf::from("checkpoints"),
            checkpoint_name:      None,
            classifier:           ClassifierKind::Windowed,
            device:               ComputeDevice::Cpu,
            seed:                 42,
            feature_noise_std:    0.05,
            label_noise_fraction: 0.10,
            noise_columns:        vec![STRESS_MPA.to_string()],
            seq_len:              10,
            split:                SplitFractions::default(),
            batch_size:           64,
            max_epochs:           None,
            early_stop_patience:  5,
            learning_rate:        0.001,
        }
    }
}

impl ExperimentConfig {
    /// Explicit name, or `best_<classifier>` so variants never share files.
    pub fn checkpoint_name(&self) -> String {
        self.checkpoint_name
            .clone()
            .unwrap_or_else(|| format!("best_{}", self.classifier))
    }

    pub fn max_epochs(&self) -> usize {
        self.max_epochs
            .unwrap_or_else(|| self.classifier.default_max_epochs())
    }

    pub fn noise_config(&self) -> NoiseConfig {
        NoiseConfig {
            seed:                 self.seed,
            feature_noise_std:    self.feature_noise_std,
            label_noise_fraction: self.label_noise_fraction,
            noise_columns:        self.noise_columns.clone(),
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            max_epochs:    self.max_epochs(),
            patience:      self.early_stop_patience,
            batch_size:    self.batch_size,
            learning_rate: self.learning_rate,
            seed:          self.seed,
        }
    }

    pub fn windowed_config(&self, data: &PreparedData) -> WindowedClassifierConfig {
        WindowedClassifierConfig::new(data.seq_len, data.feature_count, data.num_classes)
    }

    pub fn recurrent_config(&self, data: &PreparedData) -> RecurrentClassifierConfig {
        RecurrentClassifierConfig::new(data.feature_count, data.num_classes)
    }
}

// ─── Prepared data ────────────────────────────────────────────────────────────
/// Output of steps 1-6: the fixed splits of one run.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub splits:        Splits,
    pub num_classes:   usize,
    pub seq_len:       usize,
    pub feature_count: usize,
    /// Bounds fit during step 4; persisted so new rows can be scaled alike.
    pub scaler:        MinMaxScaler,
}

impl PreparedData {
    pub fn dataset(&self, kind: SplitKind) -> WindowDataset {
        WindowDataset::new(self.splits.get(kind).to_vec(), self.seq_len, self.feature_count)
    }
}

/// Steps 1-6. Each stage's failure carries the stage name as context.
pub fn prepare_data(cfg: &ExperimentConfig, source: &impl TableSource) -> Result<PreparedData> {
    // ── Step 1: Load and sort by (Frequency_Hz, Cycle_Number) ─────────────────
    let mut records = source.load_records().context("stage: input loader")?;
    if records.is_empty() {
        return Err(PipelineError::config("input table has no rows")).context("stage: input loader");
    }
    sort_records(&mut records);
    tracing::info!("Loaded {} rows", records.len());

    // ── Step 2: Categorical codes; K is fixed here, before label noise ────────
    let encoder = FeatureEncoder::fit(&records);
    let table   = encoder.encode(&records).context("stage: feature encoder")?;
    tracing::info!(
        "Encoded {} stages and {} frequency classes {:?}",
        encoder.stages().len(),
        encoder.num_classes(),
        encoder.frequencies()
    );

    // ── Step 3: Noise ─────────────────────────────────────────────────────────
    let table = NoiseInjector::new(cfg.noise_config())
        .and_then(|injector| injector.apply(table))
        .context("stage: noise injector")?;
    tracing::info!("Row class counts after noise: {:?}", table.class_counts());

    // ── Step 4: Min-max scaling (fit on the whole table) ──────────────────────
    let (scaler, table) = MinMaxScaler::fit_transform(table).context("stage: feature scaling")?;
    tracing::debug!("Scaled columns {:?} with {:?}", table.columns(), scaler);

    // ── Step 5: Windows ───────────────────────────────────────────────────────
    let windower = SequenceWindower::new(cfg.seq_len).context("stage: sequence windower")?;
    let windows  = windower.windows(&table).context("stage: sequence windower")?;
    let num_classes = table.num_classes();
    tracing::info!("Window class counts: {:?}", class_counts(&windows, num_classes));

    // ── Step 6: Stratified split ──────────────────────────────────────────────
    let splits = StratifiedSplitter::new(cfg.split, cfg.seed)
        .and_then(|splitter| splitter.split(windows, num_classes))
        .context("stage: split builder")?;

    Ok(PreparedData {
        splits,
        num_classes,
        seq_len:       windower.seq_len(),
        feature_count: table.feature_count(),
        scaler,
    })
}

// ─── Experiment report ────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub classifier:    ClassifierKind,
    pub checkpoint:    PathBuf,
    pub stop_reason:   StopReason,
    pub epochs_run:    usize,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub test:          ClassificationReport,
}

impl fmt::Display for ExperimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Classifier:  {}", self.classifier)?;
        writeln!(f, "Stopped:     {} after {} epochs", self.stop_reason, self.epochs_run)?;
        writeln!(f, "Best epoch:  {} (val_loss={:.4})", self.best_epoch, self.best_val_loss)?;
        writeln!(f, "Checkpoint:  {}", self.checkpoint.display())?;
        writeln!(f, "\nTest split:\n")?;
        write!(f, "{}", self.test)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Run the experiment on the configured CSV file.
    pub fn execute(&self) -> Result<ExperimentReport> {
        let loader = CsvLoader::new(&self.config.data);
        tracing::info!("Reading '{}'", loader.path().display());
        self.execute_from(&loader)
    }

    /// Run the experiment on rows from any source.
    pub fn execute_from(&self, source: &impl TableSource) -> Result<ExperimentReport> {
        let cfg = &self.config;
        cfg.training_config().validate().context("stage: configuration")?;

        let data = prepare_data(cfg, source)?;

        // ── Step 7: Persist the resolved config beside the checkpoint ─────────
        let store = CheckpointStore::create(&cfg.checkpoint_dir, cfg.checkpoint_name())
            .context("stage: checkpoint store")?;
        let resolved = ExperimentConfig {
            checkpoint_name: Some(store.name().to_string()),
            ..cfg.clone()
        };
        store.save_config(&resolved).context("stage: checkpoint store")?;
        store.save_scaler(&data.scaler).context("stage: checkpoint store")?;
        tracing::info!("Artifacts go to '{}'", store.dir().display());

        let report = match cfg.device {
            ComputeDevice::Cpu => self.run_on::<Autodiff<NdArray>>(&data, &store, &Default::default())?,
            #[cfg(feature = "wgpu")]
            ComputeDevice::Gpu => self.run_on::<Autodiff<burn::backend::Wgpu>>(&data, &store, &Default::default())?,
            #[cfg(not(feature = "wgpu"))]
            ComputeDevice::Gpu => return Err(gpu_unavailable()),
        };

        // ── Step 10: Report ───────────────────────────────────────────────────
        store.save_report(&report).context("stage: checkpoint store")?;
        Ok(report)
    }

    fn run_on<B: AutodiffBackend>(
        &self,
        data:   &PreparedData,
        store:  &CheckpointStore,
        device: &B::Device,
    ) -> Result<ExperimentReport> {
        tracing::info!("Using {} device: {:?}", self.config.device, device);
        match self.config.classifier {
            ClassifierKind::Windowed  => self.run_with::<B, _>(&self.config.windowed_config(data), data, store, device),
            ClassifierKind::Recurrent => self.run_with::<B, _>(&self.config.recurrent_config(data), data, store, device),
        }
    }

    fn run_with<B, C>(
        &self,
        builder: &C,
        data:    &PreparedData,
        store:   &CheckpointStore,
        device:  &B::Device,
    ) -> Result<ExperimentReport>
    where
        B: AutodiffBackend,
        C: ClassifierBuilder,
        C::Model<B>: AutodiffModule<B, InnerModule = C::Model<B::InnerBackend>>,
    {
        let cfg = &self.config;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        // Seeded right before construction so parameter init is reproducible.
        B::seed(cfg.seed);
        let model = builder.build::<B>(device);
        tracing::info!("Model ready: {} classifier, {} classes", cfg.classifier, data.num_classes);

        let outcome = train::<B, _>(
            model,
            data.dataset(SplitKind::Train),
            data.dataset(SplitKind::Validation),
            &cfg.training_config(),
            store,
            device,
        )
        .context("stage: training loop")?;

        // ── Step 9: Best checkpoint on the test split ─────────────────────────
        let evaluation = evaluate_checkpoint::<B::InnerBackend, C>(
            builder,
            store,
            data.dataset(SplitKind::Test),
            cfg.batch_size,
            device,
        )?;

        Ok(ExperimentReport {
            classifier:    cfg.classifier,
            checkpoint:    store.model_path(),
            stop_reason:   outcome.stop_reason,
            epochs_run:    outcome.epochs_run,
            best_epoch:    outcome.best_epoch,
            best_val_loss: outcome.best_val_loss,
            test:          evaluation.report(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::record::RawRecord;

    /// `n` rows spread evenly over `k` frequencies, cycles counting up
    /// within each frequency. Rows come out shuffled by frequency so the
    /// loader's sort is exercised.
    pub(crate) fn synthetic_records(n: usize, k: usize) -> Vec<RawRecord> {
        let stages = ["Initiation", "Propagation", "Failure"];
        let mut rows: Vec<RawRecord> = (0..n)
            .map(|i| {
                let class = i * k / n;
                let cycle = (i - (class * n + k - 1) / k) as f64 + 1.0;
                RawRecord::new(
                    stages[(cycle as usize) % 3],
                    10.0 * (class + 1) as f64,
                    cycle,
                    200.0 + 5.0 * class as f64 + (cycle % 7.0),
                )
            })
            .collect();
        rows.reverse();
        rows
    }

    fn quiet_config(dir: &std::path::Path) -> ExperimentConfig {
        ExperimentConfig {
            checkpoint_dir:       dir.to_path_buf(),
            feature_noise_std:    0.0,
            label_noise_fraction: 0.0,
            batch_size:           16,
            max_epochs:           Some(30),
            early_stop_patience:  30,
            learning_rate:        0.01,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.seq_len, 10);
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.early_stop_patience, 5);
        assert_eq!(cfg.max_epochs(), 25);
        assert_eq!(cfg.checkpoint_name(), "best_windowed");

        let lstm = ExperimentConfig { classifier: ClassifierKind::Recurrent, ..cfg };
        assert_eq!(lstm.max_epochs(), 20);
        assert_eq!(lstm.checkpoint_name(), "best_recurrent");
    }

    #[test]
    fn test_prepared_200_rows_give_190_windows() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = quiet_config(dir.path());
        let data = prepare_data(&cfg, &synthetic_records(200, 3)).unwrap();

        assert_eq!(data.num_classes, 3);
        assert_eq!(data.feature_count, 4);
        assert_eq!(data.splits.total(), 190);
        assert!((132..=134).contains(&data.splits.train.len()));
        assert!((18..=20).contains(&data.splits.validation.len()));
        assert!((37..=39).contains(&data.splits.test.len()));
    }

    #[test]
    fn test_preparation_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig { checkpoint_dir: dir.path().to_path_buf(), ..ExperimentConfig::default() };
        let a   = prepare_data(&cfg, &synthetic_records(200, 3)).unwrap();
        let b   = prepare_data(&cfg, &synthetic_records(200, 3)).unwrap();
        assert_eq!(a.splits.train, b.splits.train);
        assert_eq!(a.splits.test, b.splits.test);
    }

    #[test]
    fn test_full_label_noise_with_two_classes_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig {
            label_noise_fraction: 1.0,
            ..quiet_config(dir.path())
        };
        let data = prepare_data(&cfg, &synthetic_records(120, 2)).unwrap();
        assert_eq!(data.num_classes, 2);
        assert_eq!(data.splits.total(), 110);
        for split in [&data.splits.train, &data.splits.validation, &data.splits.test] {
            let counts = class_counts(split, 2);
            assert!(counts.iter().all(|&c| c > 0));
        }
    }

    #[test]
    fn test_stratification_failure_names_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = synthetic_records(200, 2);
        // A third frequency with two rows: only two windows can carry it.
        records.push(RawRecord::new("Failure", 99.0, 1.0, 250.0));
        records.push(RawRecord::new("Failure", 99.0, 2.0, 251.0));

        let err = prepare_data(&quiet_config(dir.path()), &records).unwrap_err();
        assert!(format!("{err:#}").contains("stage: split builder"));
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Stratification { class: 2, .. })
        ));
    }

    #[test]
    fn test_too_few_rows_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare_data(&quiet_config(dir.path()), &synthetic_records(10, 2)).unwrap_err();
        assert!(format!("{err:#}").contains("stage: sequence windower"));
        assert!(matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_end_to_end_beats_chance() {
        let dir    = tempfile::tempdir().unwrap();
        let cfg    = quiet_config(dir.path());
        let report = TrainUseCase::new(cfg.clone()).execute_from(&synthetic_records(200, 3)).unwrap();

        assert!(report.test.accuracy > 1.0 / 3.0, "accuracy {}", report.test.accuracy);
        assert_eq!(report.test.confusion.total(), data_test_len(&cfg));
        assert_eq!(report.stop_reason, StopReason::EpochBudgetExhausted);

        let store = CheckpointStore::open(dir.path(), "best_windowed").unwrap();
        assert!(store.model_path().exists());
        assert!(store.metrics_path().exists());
        let scaler: MinMaxScaler =
            serde_json::from_str(&std::fs::read_to_string(store.scaler_path()).unwrap()).unwrap();
        assert_eq!(scaler, prepare_data(&cfg, &synthetic_records(200, 3)).unwrap().scaler);
        let saved: ExperimentConfig = store.load_config().unwrap();
        assert_eq!(saved.checkpoint_name.as_deref(), Some("best_windowed"));
        let on_disk: ExperimentReport =
            serde_json::from_str(&std::fs::read_to_string(store.report_path()).unwrap()).unwrap();
        assert_eq!(on_disk.best_epoch, report.best_epoch);
        assert_eq!(on_disk.test.confusion, report.test.confusion);
    }

    fn data_test_len(cfg: &ExperimentConfig) -> usize {
        prepare_data(cfg, &synthetic_records(200, 3)).unwrap().splits.test.len()
    }

    #[test]
    fn test_recurrent_variant_runs_through_the_same_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig {
            classifier: ClassifierKind::Recurrent,
            max_epochs: Some(2),
            ..quiet_config(dir.path())
        };
        let report = TrainUseCase::new(cfg).execute_from(&synthetic_records(200, 3)).unwrap();
        assert_eq!(report.classifier, ClassifierKind::Recurrent);
        assert_eq!(report.epochs_run, 2);
        assert!(report.checkpoint.ends_with("best_recurrent.mpk.gz"));
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_gpu_without_feature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ExperimentConfig { device: ComputeDevice::Gpu, ..quiet_config(dir.path()) };
        assert!(TrainUseCase::new(cfg).execute_from(&synthetic_records(200, 3)).is_err());
    }
}
