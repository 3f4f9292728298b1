// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer depends on these traits rather than on
// concrete loaders, so a different storage format only needs a
// new implementation.

use crate::domain::error::Result;
use crate::domain::record::RawRecord;

// ─── TableSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the raw rows of the source table.
///
/// Implementations:
///   - CsvLoader → reads a CSV file with named columns
pub trait TableSource {
    /// Load every row, in whatever order the source stores them.
    fn load_records(&self) -> Result<Vec<RawRecord>>;
}

/// In-memory rows, used when the table is generated rather than read.
impl TableSource for Vec<RawRecord> {
    fn load_records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.clone())
    }
}
