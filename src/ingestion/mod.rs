//! Ingestion Module - Batched streaming load of CSV dumps into tables
//!
//! Handles the path from a CSV file on disk into a persistent table:
//! - Header-driven decoding with typed integer coercion
//! - Fixed-size batching with one in-flight insert at a time
//! - Draining of the trailing partial batch
//! - Schema creation for the destination table

pub mod schema;
pub mod record;
pub mod source;
pub mod sink;
pub mod sqlite_table;
pub mod ingestor;

pub use schema::{ColumnDef, ColumnKind, TableSchema};
pub use record::{CoercionError, FieldValue, Record};
pub use source::{RecordSource, RowSource};
pub use sink::Sink;
pub use sqlite_table::SqliteTable;
pub use ingestor::{BatchedIngestor, IngestionSession, SessionState};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion report for one drained session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestReport {
    /// Ingestion run ID
    pub run_id: String,

    /// Destination table
    pub table_name: String,

    /// File the records came from (unset when ingesting from a raw reader)
    pub source_path: Option<String>,

    /// Number of records decoded from the source
    pub records_decoded: u64,

    /// Number of records handed to the sink
    pub records_inserted: u64,

    /// Number of insert calls issued
    pub batches_flushed: u64,

    /// Integer fields that did not parse and were forwarded as NULL
    pub malformed_values: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IngestionStatus {
    Success,
    Failed,
}
