//! Batched Ingestor - Bounded-memory streaming load of one file into one sink
//!
//! A session pulls records one at a time, buffers them, and hands each full
//! batch to the sink before pulling again. At most one insert is ever in flight
//! and a final partial batch is drained once the source is exhausted.

use crate::config::IngestOptions;
use crate::error::{IngestError, Result};
use crate::ingestion::record::Record;
use crate::ingestion::schema::TableSchema;
use crate::ingestion::sink::Sink;
use crate::ingestion::source::{RecordSource, RowSource};
use crate::ingestion::IngestReport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of an ingestion session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, nothing pulled yet
    Idle,
    /// Pulling records into the current batch
    Accumulating,
    /// One insert call is in flight; the source is not read
    Flushing,
    /// Source exhausted and every record persisted
    Drained,
    /// Aborted by a decode or persist failure
    Failed,
}

/// State of one run over one file
pub struct IngestionSession<S: RecordSource, K: Sink> {
    run_id: String,
    source: S,
    sink: K,
    batch: Vec<Record>,
    batch_size: usize,
    state: SessionState,
    records_decoded: u64,
    records_inserted: u64,
    batches_flushed: u64,
    malformed_values: u64,
}

impl<S: RecordSource, K: Sink> IngestionSession<S, K> {
    pub fn new(source: S, sink: K, options: &IngestOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            source,
            sink,
            batch: Vec::with_capacity(options.batch_size),
            batch_size: options.batch_size,
            state: SessionState::Idle,
            records_decoded: 0,
            records_inserted: 0,
            batches_flushed: 0,
            malformed_values: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Drive the session to `Drained`, or to `Failed` on the first error
    pub fn run(&mut self) -> Result<IngestReport> {
        if self.state != SessionState::Idle {
            return Err(IngestError::Config(format!(
                "session {} already ran (state {:?})",
                self.run_id, self.state
            )));
        }

        let started_at = Utc::now();
        let table = self.source.schema().table_name.clone();
        info!(
            run_id = %self.run_id,
            table = %table,
            batch_size = self.batch_size,
            "ingestion started"
        );
        self.state = SessionState::Accumulating;

        while let Some(next) = self.source.next_record() {
            match next {
                Ok(record) => {
                    self.records_decoded += 1;
                    self.malformed_values += record.malformed_count() as u64;
                    if record.malformed_count() > 0 {
                        debug!(
                            table = %table,
                            line = record.line,
                            "record carries a non-integer value"
                        );
                    }
                    self.batch.push(record);
                    if self.batch.len() >= self.batch_size {
                        self.flush(&table)?;
                    }
                }
                Err(err) => {
                    error!(
                        table = %table,
                        discarded = self.batch.len(),
                        error = %err,
                        "decode failure, aborting session"
                    );
                    self.batch.clear();
                    self.state = SessionState::Failed;
                    return Err(err);
                }
            }
        }

        // drain
        if !self.batch.is_empty() {
            self.flush(&table)?;
        }
        self.state = SessionState::Drained;

        if self.malformed_values > 0 {
            warn!(
                table = %table,
                malformed = self.malformed_values,
                "integer columns contained unparsable values"
            );
        }
        info!(
            run_id = %self.run_id,
            table = %table,
            records = self.records_inserted,
            batches = self.batches_flushed,
            "ingestion drained"
        );

        Ok(IngestReport {
            run_id: self.run_id.clone(),
            table_name: table,
            source_path: None,
            records_decoded: self.records_decoded,
            records_inserted: self.records_inserted,
            batches_flushed: self.batches_flushed,
            malformed_values: self.malformed_values,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn flush(&mut self, table: &str) -> Result<()> {
        self.state = SessionState::Flushing;
        let size = self.batch.len();
        let batch_no = self.batches_flushed + 1;
        debug!(table = %table, batch = batch_no, size, "flushing batch");

        if let Err(err) = self.sink.insert(&self.batch) {
            error!(
                table = %table,
                batch = batch_no,
                size,
                error = %err,
                "insert failed, aborting session"
            );
            self.batch.clear();
            self.state = SessionState::Failed;
            return Err(match err {
                IngestError::Persist(_) => err,
                other => IngestError::Persist(other.to_string()),
            });
        }

        self.records_inserted += size as u64;
        self.batches_flushed = batch_no;
        self.batch.clear();
        self.state = SessionState::Accumulating;
        Ok(())
    }
}

/// Schema-agnostic entry point: one file into one sink per call
#[derive(Clone, Debug, Default)]
pub struct BatchedIngestor {
    options: IngestOptions,
}

impl BatchedIngestor {
    pub fn new(options: IngestOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Run a session over an already opened source
    pub fn ingest<S: RecordSource, K: Sink>(&self, source: S, sink: K) -> Result<IngestReport> {
        IngestionSession::new(source, sink, &self.options)?.run()
    }

    /// Open `path` against `schema`, make sure the table exists, load it and close the sink.
    ///
    /// The sink is closed whether or not the load succeeded, including when the
    /// file cannot be opened or its header is unusable.
    pub fn ingest_file<K: Sink>(
        &self,
        path: impl AsRef<Path>,
        schema: TableSchema,
        mut sink: K,
    ) -> Result<IngestReport> {
        let path = path.as_ref();
        let outcome = self
            .options
            .validate()
            .and_then(|_| RowSource::open(path, schema, self.options.on_bad_integer))
            .and_then(|source| {
                sink.ensure_schema()?;
                self.ingest(source, &mut sink)
            });
        let closed = sink.close();

        let mut report = outcome?;
        closed?;
        report.source_path = Some(path.display().to_string());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::record::FieldValue;
    use crate::ingestion::schema::{ColumnDef, ColumnKind};

    /// Yields a fixed script of records and errors
    struct ScriptedSource {
        schema: TableSchema,
        items: std::vec::IntoIter<Result<Record>>,
    }

    impl ScriptedSource {
        fn new(items: Vec<Result<Record>>) -> Self {
            Self {
                schema: TableSchema::new("t", vec![ColumnDef::new("Index", ColumnKind::Integer)]),
                items: items.into_iter(),
            }
        }

        fn rows(n: u64) -> Self {
            Self::new((0..n).map(|i| Ok(row(i))).collect())
        }
    }

    impl RecordSource for ScriptedSource {
        fn next_record(&mut self) -> Option<Result<Record>> {
            self.items.next()
        }

        fn schema(&self) -> &TableSchema {
            &self.schema
        }
    }

    #[derive(Default)]
    struct CountingSink {
        sizes: Vec<usize>,
        fail_on_call: Option<usize>,
        closed: usize,
    }

    impl Sink for CountingSink {
        fn ensure_schema(&mut self) -> Result<()> {
            Ok(())
        }

        fn insert(&mut self, records: &[Record]) -> Result<()> {
            if self.fail_on_call == Some(self.sizes.len() + 1) {
                return Err(IngestError::Io(std::io::Error::other("disk full")));
            }
            self.sizes.push(records.len());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed += 1;
            Ok(())
        }
    }

    fn row(i: u64) -> Record {
        Record::new(i + 2, vec![FieldValue::Integer(i as i64)])
    }

    fn opts(batch_size: usize) -> IngestOptions {
        IngestOptions::default().with_batch_size(batch_size)
    }

    #[test]
    fn test_state_transitions_to_drained() {
        let mut session =
            IngestionSession::new(ScriptedSource::rows(3), CountingSink::default(), &opts(2))
                .unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        let report = session.run().unwrap();
        assert_eq!(report.run_id, session.run_id());
        assert_eq!(session.state(), SessionState::Drained);
        assert_eq!(session.sink().sizes, vec![2, 1]);
        assert_eq!(report.records_decoded, 3);
        assert_eq!(report.records_inserted, 3);
        assert_eq!(report.batches_flushed, 2);
    }

    #[test]
    fn test_second_run_rejected() {
        let mut session =
            IngestionSession::new(ScriptedSource::rows(1), CountingSink::default(), &opts(2))
                .unwrap();
        session.run().unwrap();
        assert!(matches!(session.run(), Err(IngestError::Config(_))));
        assert_eq!(session.sink().sizes, vec![1]);
    }

    #[test]
    fn test_zero_batch_size_rejected_up_front() {
        let result =
            IngestionSession::new(ScriptedSource::rows(1), CountingSink::default(), &opts(0));
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_decode_failure_discards_buffer() {
        let items = vec![
            Ok(row(0)),
            Ok(row(1)),
            Ok(row(2)),
            Err(IngestError::Decode {
                line: 5,
                message: "bad quote".to_string(),
            }),
            Ok(row(4)),
        ];
        let mut session =
            IngestionSession::new(ScriptedSource::new(items), CountingSink::default(), &opts(2))
                .unwrap();
        let err = session.run().unwrap_err();
        assert!(matches!(err, IngestError::Decode { line: 5, .. }));
        assert_eq!(session.state(), SessionState::Failed);
        // the first full batch stays persisted; row 2 was buffered and is lost
        assert_eq!(session.sink().sizes, vec![2]);
    }

    #[test]
    fn test_sink_errors_surface_as_persist_failure() {
        let sink = CountingSink {
            fail_on_call: Some(1),
            ..Default::default()
        };
        let mut session = IngestionSession::new(ScriptedSource::rows(3), sink, &opts(2)).unwrap();
        let err = session.run().unwrap_err();
        assert!(matches!(err, IngestError::Persist(ref msg) if msg.contains("disk full")));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.sink().sizes.is_empty());
    }

    #[test]
    fn test_ingest_file_missing_path_still_closes_sink() {
        let mut sink = CountingSink::default();
        let err = BatchedIngestor::default()
            .ingest_file("/no/such/dump/customers.csv", TableSchema::customers(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }));
        assert_eq!(err.kind(), "not_found");
        assert_eq!(sink.closed, 1);
    }

    #[test]
    fn test_ingest_file_bad_header_still_closes_sink() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("organizations.csv");
        std::fs::write(&path, "Index,Name\n1,Acme\n").unwrap();

        let mut sink = CountingSink::default();
        let err = BatchedIngestor::default()
            .ingest_file(&path, TableSchema::organizations(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, IngestError::Decode { line: 1, .. }));
        assert_eq!(err.kind(), "decode_failure");
        assert_eq!(sink.closed, 1);
        assert!(sink.sizes.is_empty());
    }

    #[test]
    fn test_ingest_file_zero_batch_size_still_closes_sink() {
        let mut sink = CountingSink::default();
        let err = BatchedIngestor::new(opts(0))
            .ingest_file("/no/such/dump/customers.csv", TableSchema::customers(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
        assert_eq!(sink.closed, 1);
    }
}
