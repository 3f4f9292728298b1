// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// This layer handles everything from the raw CSV table all the
// way to tensor batches.
//
// The pipeline flows in this order:
//
//   fatigue CSV
//       │
//       ▼
//   CsvLoader           → reads rows, keeps the four used columns
//       │                 (then sorted by Frequency_Hz, Cycle_Number)
//       ▼
//   FeatureEncoder      → Stage / Frequency_Hz → integer codes
//       │
//       ▼
//   NoiseInjector       → Gaussian feature noise + label flips
//       │
//       ▼
//   MinMaxScaler        → every column into [0, 1]
//       │
//       ▼
//   SequenceWindower    → overlapping windows, next-row label
//       │
//       ▼
//   StratifiedSplitter  → train / validation / test
//       │
//       ▼
//   WindowDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   WindowBatcher       → stacks windows into tensor batches
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the fatigue table from CSV
pub mod loader;

/// Categorical codes and min-max scaling
pub mod encoder;

/// Seeded feature and label noise
pub mod noise;

/// Sliding windows over the ordered table
pub mod windower;

/// Class-stratified train/validation/test partition
pub mod splitter;

/// Implements Burn's Dataset trait for windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
