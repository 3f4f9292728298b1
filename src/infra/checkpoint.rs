// ============================================================
// Layer 6 - Checkpoint Store
// ============================================================
// Saves and restores the best model using Burn's
// NamedMpkGzFileRecorder at full precision, so a reloaded model
// reproduces the validation loss measured before saving.
//
// One store per run name. Artifacts live side by side:
//
//   <dir>/
//     best_windowed.mpk.gz         ← best weights (overwritten on improvement)
//     best_windowed.config.json    ← experiment config, rebuilds the pipeline
//     best_windowed.scaler.json    ← fitted min-max bounds
//     best_windowed.metrics.csv    ← one row per epoch
//     best_windowed.report.json    ← final report
//
// The weights are type-checked on load: a record saved from one
// architecture cannot be loaded into another.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::error::{PipelineError, Result};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir:  PathBuf,
    name: String,
}

impl CheckpointStore {
    /// Create the store, creating `dir` (and its parents) if needed.
    pub fn create(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let store = Self::open(dir, name)?;
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    /// Refer to an existing store without touching the filesystem.
    pub fn open(dir: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(PipelineError::config(format!(
                "checkpoint name '{name}' must be a plain, non-empty file stem"
            )));
        }
        Ok(Self { dir: dir.into(), name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path handed to the recorder; it appends `.mpk.gz` itself.
    fn model_stem(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{}.mpk.gz", self.name))
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(format!("{}.config.json", self.name))
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(format!("{}.metrics.csv", self.name))
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(format!("{}.scaler.json", self.name))
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(format!("{}.report.json", self.name))
    }

    /// Overwrite the stored weights with `model`'s.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        CheckpointRecorder::new()
            .record(model.clone().into_record(), self.model_stem())
            .map_err(|e| {
                PipelineError::Checkpoint(format!(
                    "cannot save '{}': {e:?}",
                    self.model_path().display()
                ))
            })?;
        tracing::debug!("Saved checkpoint '{}'", self.model_path().display());
        Ok(())
    }

    /// Load the stored weights into `model`, which must have the
    /// architecture they were saved from.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let record = CheckpointRecorder::new()
            .load(self.model_stem(), device)
            .map_err(|e| {
                PipelineError::Checkpoint(format!(
                    "cannot load '{}' (has this run been trained?): {e:?}",
                    self.model_path().display()
                ))
            })?;
        tracing::info!("Loaded checkpoint '{}'", self.model_path().display());
        Ok(model.load_record(record))
    }

    pub fn save_config<T: Serialize>(&self, config: &T) -> Result<()> {
        write_json(&self.config_path(), config)
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        read_json(&self.config_path())
    }

    pub fn save_report<T: Serialize>(&self, report: &T) -> Result<()> {
        write_json(&self.report_path(), report)
    }

    pub fn save_scaler<T: Serialize>(&self, scaler: &T) -> Result<()> {
        write_json(&self.scaler_path(), scaler)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).map_err(|e| {
        PipelineError::Checkpoint(format!("cannot read '{}': {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&json)?)
}
