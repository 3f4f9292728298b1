// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (running an experiment or re-scoring one).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination, with each stage's failure
//     wrapped in anyhow context naming the stage
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The full experiment: pipeline, training, test evaluation
pub mod train_use_case;

// Evaluation of a saved checkpoint on any split
pub mod evaluate_use_case;
