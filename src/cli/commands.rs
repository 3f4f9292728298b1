// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::{ComputeDevice, ExperimentConfig};
use crate::domain::window::{SplitFractions, SplitKind};
use crate::ml::model::ClassifierKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full experiment: pipeline, training, test evaluation
    Train(TrainArgs),

    /// Evaluate a saved checkpoint on one split
    Evaluate(EvaluateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierArg {
    /// Flattened window through a two-block MLP
    Windowed,
    /// Single-layer LSTM over the window
    Recurrent,
}

impl From<ClassifierArg> for ClassifierKind {
    fn from(a: ClassifierArg) -> Self {
        match a {
            ClassifierArg::Windowed  => ClassifierKind::Windowed,
            ClassifierArg::Recurrent => ClassifierKind::Recurrent,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    /// Requires a build with `--features wgpu`
    Gpu,
}

impl From<DeviceArg> for ComputeDevice {
    fn from(a: DeviceArg) -> Self {
        match a {
            DeviceArg::Cpu => ComputeDevice::Cpu,
            DeviceArg::Gpu => ComputeDevice::Gpu,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitArg {
    Train,
    Validation,
    Test,
}

impl From<SplitArg> for SplitKind {
    fn from(a: SplitArg) -> Self {
        match a {
            SplitArg::Train      => SplitKind::Train,
            SplitArg::Validation => SplitKind::Validation,
            SplitArg::Test       => SplitKind::Test,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with Stage, Frequency_Hz, Cycle_Number, Stress_MPa columns
    #[arg(long, default_value = "data/fatigue.csv")]
    pub data: PathBuf,

    /// Directory for the checkpoint, config, metrics and report files
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// File stem for this run's artifacts [default: best_<classifier>]
    #[arg(long)]
    pub checkpoint_name: Option<String>,

    #[arg(long, value_enum, default_value_t = ClassifierArg::Windowed)]
    pub classifier: ClassifierArg,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    /// Seeds noise, split, parameter init and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the Gaussian noise added to --noise-columns
    #[arg(long, default_value_t = 0.05)]
    pub feature_noise_std: f64,

    /// Fraction of rows whose label is replaced by another class
    #[arg(long, default_value_t = 0.10)]
    pub label_noise_fraction: f64,

    /// Comma-separated numeric columns that receive feature noise
    #[arg(long, value_delimiter = ',', default_value = "Stress_MPa")]
    pub noise_columns: Vec<String>,

    /// Rows per window
    #[arg(long, default_value_t = 10)]
    pub seq_len: usize,

    #[arg(long, default_value_t = 0.70)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 0.10)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 0.20)]
    pub test_fraction: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Epoch budget [default: 25 windowed, 20 recurrent]
    #[arg(long)]
    pub max_epochs: Option<usize>,

    /// Epochs without validation improvement before stopping
    #[arg(long, default_value_t = 5)]
    pub early_stop_patience: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,
}

/// Convert CLI TrainArgs into the application-layer ExperimentConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        ExperimentConfig {
            data:                 a.data,
            checkpoint_dir:       a.checkpoint_dir,
            checkpoint_name:      a.checkpoint_name,
            classifier:           a.classifier.into(),
            device:               a.device.into(),
            seed:                 a.seed,
            feature_noise_std:    a.feature_noise_std,
            label_noise_fraction: a.label_noise_fraction,
            noise_columns:        a.noise_columns,
            seq_len:              a.seq_len,
            split: SplitFractions {
                train:      a.train_fraction,
                validation: a.val_fraction,
                test:       a.test_fraction,
            },
            batch_size:           a.batch_size,
            max_epochs:           a.max_epochs,
            early_stop_patience:  a.early_stop_patience,
            learning_rate:        a.lr,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory where `train` wrote its artifacts
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Artifact stem used by `train`, e.g. best_windowed
    #[arg(long)]
    pub checkpoint_name: String,

    #[arg(long, value_enum, default_value_t = SplitArg::Test)]
    pub split: SplitArg,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> ExperimentConfig {
        let cli = Cli::try_parse_from([&["fatigue-seq", "train"][..], args].concat()).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_experiment_defaults() {
        assert_eq!(train_config(&[]), ExperimentConfig::default());
    }

    #[test]
    fn test_train_flags_map_into_config() {
        let cfg = train_config(&[
            "--classifier", "recurrent",
            "--noise-columns", "Stress_MPa,Cycle_Number",
            "--label-noise-fraction", "0.12",
            "--max-epochs", "7",
            "--checkpoint-name", "lstm_run",
        ]);
        assert_eq!(cfg.classifier, ClassifierKind::Recurrent);
        assert_eq!(cfg.noise_columns, vec!["Stress_MPa", "Cycle_Number"]);
        assert_eq!(cfg.label_noise_fraction, 0.12);
        assert_eq!(cfg.max_epochs(), 7);
        assert_eq!(cfg.checkpoint_name(), "lstm_run");
    }

    #[test]
    fn test_evaluate_requires_a_name_and_defaults_to_test() {
        assert!(Cli::try_parse_from(["fatigue-seq", "evaluate"]).is_err());
        let cli = Cli::try_parse_from(["fatigue-seq", "evaluate", "--checkpoint-name", "best_windowed"]).unwrap();
        match cli.command {
            Commands::Evaluate(a) => assert_eq!(a.split, SplitArg::Test),
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
