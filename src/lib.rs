pub mod config;
pub mod error;
pub mod ingestion;
pub mod loader;

pub use config::{CoercionPolicy, IngestOptions, DEFAULT_BATCH_SIZE};
pub use error::{IngestError, Result};
pub use loader::{DumpLoader, LoadSummary, TableOutcome};
