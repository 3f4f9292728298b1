// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records per-epoch training metrics to a CSV file.
//
// Metrics recorded per epoch:
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - train_loss:   mean cross-entropy over all training windows
//   - val_loss:     mean cross-entropy over all validation windows
//   - val_accuracy: fraction of validation windows classified correctly
//   - improved:     whether this epoch produced a new best checkpoint
//
// Example CSV output:
//   epoch,train_loss,val_loss,val_accuracy,improved
//   1,1.0912,1.0543,0.47368421052631576,true
//   2,0.9821,1.061,0.42105263157894735,false
//   ...
//
// Rows are written through csv::Writer from the serde form of
// EpochMetrics, so the header comes from the field names and
// floats keep full precision. The file is truncated when a run
// starts, so it always describes exactly one run.

use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::domain::error::Result;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Sample-weighted mean loss over the training pass
    pub train_loss: f64,

    /// Sample-weighted mean loss over the validation pass
    pub val_loss: f64,

    /// Range: [0.0, 1.0]
    pub val_accuracy: f64,

    /// True if val_loss beat every earlier epoch
    pub improved: bool,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
    writer:   csv::Writer<File>,
}

impl MetricsLogger {
    /// Start a fresh log at `path`, replacing any earlier run's file.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = path.into();
        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = csv::Writer::from_path(&csv_path)?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path, writer })
    }

    /// Append one epoch's metrics as a new row. The header goes out
    /// with the first row.
    pub fn log(&mut self, m: &EpochMetrics) -> Result<()> {
        self.writer.serialize(m)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
