//! Sink Trait - Abstract destination for batched records

use crate::error::Result;
use crate::ingestion::record::Record;

/// Persistent store the batched ingestor writes into.
///
/// Implementations:
/// - SqliteTable: one table in a SQLite database file
pub trait Sink {
    /// Create the destination structure if it does not exist yet.
    /// An existing structure is left untouched.
    fn ensure_schema(&mut self) -> Result<()>;

    /// Persist a batch in one bulk write. An empty batch is a no-op.
    fn insert(&mut self, records: &[Record]) -> Result<()>;

    /// Release the underlying connection. Calling it again does nothing.
    fn close(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn ensure_schema(&mut self) -> Result<()> {
        (**self).ensure_schema()
    }

    fn insert(&mut self, records: &[Record]) -> Result<()> {
        (**self).insert(records)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
