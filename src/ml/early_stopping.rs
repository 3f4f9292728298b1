// ============================================================
// Layer 5 - Early Stopping
// ============================================================
// Tracks validation loss across epochs:
//
//   loss < best          → Improved   (new best, counter = 0)
//   otherwise            → counter += 1
//   counter == patience  → Stop
//
// Improvement is strict: an epoch that only ties the best loss
// counts as stale.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the epoch loop ended. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EarlyStopped,
    EpochBudgetExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EarlyStopped         => write!(f, "early stopped"),
            StopReason::EpochBudgetExhausted => write!(f, "epoch budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Best loss so far; the caller should checkpoint.
    Improved,
    /// No improvement, still within patience.
    Stale { epochs_without_improvement: usize },
    /// Patience used up.
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:                   usize,
    best_loss:                  f64,
    best_epoch:                 Option<usize>,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_loss: f64::INFINITY,
            best_epoch: None,
            epochs_without_improvement: 0,
        }
    }

    /// Record the validation loss of `epoch` (1-based).
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> Progress {
        if val_loss < self.best_loss {
            self.best_loss                  = val_loss;
            self.best_epoch                 = Some(epoch);
            self.epochs_without_improvement = 0;
            return Progress::Improved;
        }
        self.epochs_without_improvement += 1;
        if self.epochs_without_improvement >= self.patience {
            Progress::Stop
        } else {
            Progress::Stale { epochs_without_improvement: self.epochs_without_improvement }
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}
