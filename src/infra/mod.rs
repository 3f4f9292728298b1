// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// File-backed artifacts of a run:
//
//   checkpoint.rs - best model weights (burn recorder) plus the
//                   JSON config and report stored beside them
//
//   metrics.rs    - per-epoch metrics CSV
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
