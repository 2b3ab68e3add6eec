//! Row Source - Pull-based CSV decoder producing typed records
//!
//! The ingestor asks for the next record when it is ready for one, so there is
//! no pause/resume signal: while a batch is being flushed nothing is read.

use crate::config::CoercionPolicy;
use crate::error::{IngestError, Result};
use crate::ingestion::record::{coerce_field, Record};
use crate::ingestion::schema::TableSchema;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Anything the batched ingestor can pull records from
pub trait RecordSource {
    /// Next decoded record, `None` once the input is exhausted
    fn next_record(&mut self) -> Option<Result<Record>>;

    /// Schema every produced record conforms to
    fn schema(&self) -> &TableSchema;
}

/// Decodes a header-first CSV stream into [`Record`]s of one schema
pub struct RowSource<R: Read> {
    reader: csv::Reader<R>,
    schema: TableSchema,
    policy: CoercionPolicy,
    /// For each schema column, its position in the header row
    positions: Vec<usize>,
    row: StringRecord,
    exhausted: bool,
}

impl RowSource<File> {
    /// Open a CSV file; fails with `NotFound` when it cannot be opened
    pub fn open(
        path: impl AsRef<Path>,
        schema: TableSchema,
        policy: CoercionPolicy,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IngestError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), table = %schema.table_name, "opened row source");
        Self::from_reader(file, schema, policy)
    }
}

impl<R: Read> RowSource<R> {
    pub fn from_reader(reader: R, schema: TableSchema, policy: CoercionPolicy) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader.headers().map_err(decode_error)?.clone();
        let positions = schema
            .columns
            .iter()
            .map(|col| {
                headers
                    .iter()
                    .position(|h| h == col.name)
                    .ok_or_else(|| IngestError::Decode {
                        line: 1,
                        message: format!(
                            "missing column '{}' for table '{}'",
                            col.name, schema.table_name
                        ),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reader,
            schema,
            policy,
            positions,
            row: StringRecord::new(),
            exhausted: false,
        })
    }

    fn decode_current(&self) -> Result<Record> {
        let line = self.row.position().map(|p| p.line()).unwrap_or(0);
        let mut values = Vec::with_capacity(self.positions.len());
        for (col, &pos) in self.schema.columns.iter().zip(&self.positions) {
            let raw = self.row.get(pos).unwrap_or("");
            let value = coerce_field(&col.name, col.kind, raw, self.policy).map_err(|err| {
                IngestError::Decode {
                    line,
                    message: err.to_string(),
                }
            })?;
            values.push(value);
        }
        Ok(Record::new(line, values))
    }
}

impl<R: Read> RecordSource for RowSource<R> {
    fn next_record(&mut self) -> Option<Result<Record>> {
        if self.exhausted {
            return None;
        }
        match self.reader.read_record(&mut self.row) {
            Ok(true) => {
                let decoded = self.decode_current();
                if decoded.is_err() {
                    self.exhausted = true;
                }
                Some(decoded)
            }
            Ok(false) => {
                self.exhausted = true;
                None
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(decode_error(err)))
            }
        }
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

fn decode_error(err: csv::Error) -> IngestError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    IngestError::Decode {
        line,
        message: err.to_string(),
    }
}
