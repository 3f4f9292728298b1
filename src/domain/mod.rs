// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe the experiment:
// raw table rows, the encoded feature table, windows,
// splits, the error taxonomy and the metrics report.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every pipeline stage
pub mod error;

// Raw rows and the encoded feature table
pub mod record;

// Fixed-length windows and the three-way split
pub mod window;

// Confusion matrix and classification report
pub mod report;

// Core abstractions (traits) that other layers implement
pub mod traits;
