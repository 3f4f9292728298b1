// ============================================================
// Layer 3 - Pipeline Errors
// ============================================================
// Every stage below the application layer reports failures
// through PipelineError. Each variant names the invariant that
// was violated so the run can abort with a specific cause.
// None of these are retried: the pipeline is deterministic for
// a given seed, so repeating the computation gives the same error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid option values, degenerate class counts, too few rows.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A categorical or numeric cell could not be encoded.
    #[error("encoding error in column '{column}': {reason}")]
    Encoding { column: String, reason: String },

    /// A class cannot be represented in every requested split.
    #[error("stratification error: class {class} has {count} windows, {reason}")]
    Stratification {
        class:  usize,
        count:  usize,
        reason: String,
    },

    /// Training or validation produced a NaN/Inf loss.
    #[error("optimization diverged: non-finite {phase} loss ({loss}) in epoch {epoch}")]
    OptimizationDiverged {
        epoch: usize,
        phase: &'static str,
        loss:  f64,
    },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn encoding(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding { column: column.into(), reason: reason.into() }
    }
}
