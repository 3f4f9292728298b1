// ============================================================
// Layer 4 - Noise Injector
// ============================================================
// Degrades the encoded table in a reproducible way:
//
//   1. Feature noise - every configured numeric column gets
//      independent N(0, σ²) added to each cell.
//   2. Label noise  - ⌊fraction × rows⌋ rows, drawn uniformly
//      without replacement, get a different class chosen
//      uniformly from the other K-1 classes.
//
// All randomness comes from one StdRng seeded with the run seed,
// consumed in a fixed order (columns left to right, rows top to
// bottom, then the label draw), so the same seed always yields
// the same bytes. Row order is never changed.

use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};
use crate::domain::record::{FeatureTable, STRESS_MPA};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub seed:                 u64,
    pub feature_noise_std:    f64,
    pub label_noise_fraction: f64,
    pub noise_columns:        Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed:                 42,
            feature_noise_std:    0.05,
            label_noise_fraction: 0.10,
            noise_columns:        vec![STRESS_MPA.to_string()],
        }
    }
}

pub struct NoiseInjector {
    config: NoiseConfig,
}

impl NoiseInjector {
    pub fn new(config: NoiseConfig) -> Result<Self> {
        if !config.feature_noise_std.is_finite() || config.feature_noise_std < 0.0 {
            return Err(PipelineError::config(format!(
                "feature_noise_std must be a finite value >= 0, got {}",
                config.feature_noise_std
            )));
        }
        if !(0.0..=1.0).contains(&config.label_noise_fraction) {
            return Err(PipelineError::config(format!(
                "label_noise_fraction must be within [0, 1], got {}",
                config.label_noise_fraction
            )));
        }
        Ok(Self { config })
    }

    pub fn apply(&self, mut table: FeatureTable) -> Result<FeatureTable> {
        let cfg     = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        // ── Feature noise ─────────────────────────────────────────────────────
        let columns = self.resolve_columns(&table)?;
        if cfg.feature_noise_std > 0.0 {
            let normal = Normal::new(0.0, cfg.feature_noise_std)
                .map_err(|e| PipelineError::config(format!("invalid noise distribution: {e}")))?;
            for &col in &columns {
                for row in 0..table.row_count() {
                    let v = table.rows()[row][col] + normal.sample(&mut rng);
                    table.set_value(row, col, v);
                }
            }
        }

        // ── Label noise ───────────────────────────────────────────────────────
        let rows    = table.row_count();
        let n_flips = flip_count(cfg.label_noise_fraction, rows);
        if n_flips > 0 {
            let k = table.num_classes();
            if k <= 1 {
                return Err(PipelineError::config(format!(
                    "label noise needs at least 2 classes to relabel to, found {k}"
                )));
            }
            for row in index::sample(&mut rng, rows, n_flips).iter() {
                let current = table.labels()[row];
                // Draw from the K-1 other classes, skipping over `current`.
                let draw = rng.gen_range(0..k - 1);
                let next = if draw >= current { draw + 1 } else { draw };
                table.relabel(row, next);
            }
        }

        tracing::info!(
            "Noise injected: σ={} on {:?}, {} of {} labels replaced",
            cfg.feature_noise_std,
            cfg.noise_columns,
            n_flips,
            rows
        );
        Ok(table)
    }

    fn resolve_columns(&self, table: &FeatureTable) -> Result<Vec<usize>> {
        self.config
            .noise_columns
            .iter()
            .map(|name| {
                let col = table.column_index(name).ok_or_else(|| {
                    PipelineError::config(format!("noise column '{name}' is not a feature column"))
                })?;
                if col == table.label_column() {
                    return Err(PipelineError::config(format!(
                        "'{name}' is label-derived; use label_noise_fraction instead"
                    )));
                }
                Ok(col)
            })
            .collect()
    }
}

/// ⌊fraction × rows⌋, tolerant of products like 0.29 × 100 = 28.999…
fn flip_count(fraction: f64, rows: usize) -> usize {
    ((fraction * rows as f64) + 1e-9).floor().min(rows as f64) as usize
}
