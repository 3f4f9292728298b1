// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs a burn Module.
//
//   model.rs          - SequenceClassifier trait plus the two
//                       variants (windowed MLP, LSTM)
//
//   early_stopping.rs - patience bookkeeping on validation loss
//
//   trainer.rs        - the epoch loop: Adam updates, validation
//                       pass, best-checkpoint saving
//
//   evaluator.rs      - inference over a split, producing
//                       (true, predicted) pairs and mean loss
//
// The trainer and evaluator are generic over the classifier, so
// neither knows which variant it is driving.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Classifier contract and the two architectures
pub mod model;

/// Validation-loss patience tracking
pub mod early_stopping;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference pass producing predictions and loss
pub mod evaluator;
