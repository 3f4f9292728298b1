// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    - runs the full experiment and prints the
//                   test-split report of the best checkpoint
//   2. `evaluate` - re-scores a saved checkpoint on one split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "fatigue-seq",
    version,
    about = "Train and evaluate sequence classifiers on noisy fatigue-test data."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

/// Converts CLI args into an ExperimentConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into();
    let report = TrainUseCase::new(config).execute()?;

    println!("\n{report}");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let summary = EvaluateUseCase::new(args.checkpoint_dir, args.checkpoint_name, args.split.into())
        .execute()?;

    println!(
        "\n{} classifier, {} split ({} windows), mean loss {:.4}\n",
        summary.config.classifier,
        summary.split,
        summary.evaluation.targets.len(),
        summary.evaluation.mean_loss,
    );
    println!("{}", summary.evaluation.report());
    Ok(())
}
