//! Dump Loader - Loads every table of an extracted data dump into one database
//!
//! Each table is an independent session with its own connection; a failing
//! table is reported and the next one still runs.

use crate::config::IngestOptions;
use crate::error::{IngestError, Result};
use crate::ingestion::{BatchedIngestor, IngestReport, IngestionStatus, SqliteTable, TableSchema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Database file name created inside the output directory
pub const DATABASE_FILE: &str = "database.sqlite";

/// Outcome of one table's session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableOutcome {
    pub table_name: String,
    pub source_path: PathBuf,
    pub status: IngestionStatus,
    pub report: Option<IngestReport>,
    /// Failure kind (`not_found`, `decode_failure`, `persist_failure`, ...)
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl TableOutcome {
    fn from_result(
        schema: &TableSchema,
        source_path: PathBuf,
        result: Result<IngestReport>,
    ) -> Self {
        match result {
            Ok(report) => Self {
                table_name: schema.table_name.clone(),
                source_path,
                status: IngestionStatus::Success,
                report: Some(report),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                table_name: schema.table_name.clone(),
                source_path,
                status: IngestionStatus::Failed,
                report: None,
                error_kind: Some(err.kind().to_string()),
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoadSummary {
    pub database_path: PathBuf,
    pub tables: Vec<TableOutcome>,
}

impl LoadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.tables.iter().all(|t| t.status == IngestionStatus::Success)
    }

    pub fn records_inserted(&self) -> u64 {
        self.tables
            .iter()
            .filter_map(|t| t.report.as_ref())
            .map(|r| r.records_inserted)
            .sum()
    }
}

pub struct DumpLoader {
    dump_dir: PathBuf,
    database_path: PathBuf,
    tables: Vec<TableSchema>,
    ingestor: BatchedIngestor,
}

impl DumpLoader {
    /// Loader for the standard dump layout: `customers.csv` then `organizations.csv`
    pub fn new(
        dump_dir: impl Into<PathBuf>,
        database_path: impl Into<PathBuf>,
        options: IngestOptions,
    ) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            database_path: database_path.into(),
            tables: vec![TableSchema::customers(), TableSchema::organizations()],
            ingestor: BatchedIngestor::new(options),
        }
    }

    /// Replace the list of tables to load, in order
    pub fn with_tables(mut self, tables: Vec<TableSchema>) -> Self {
        self.tables = tables;
        self
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Expected CSV file for a table inside the dump directory
    pub fn csv_path(&self, schema: &TableSchema) -> PathBuf {
        self.dump_dir.join(format!("{}.csv", schema.table_name))
    }

    /// Load every table; configuration errors abort before any table is touched
    pub fn load(&self) -> Result<LoadSummary> {
        self.ingestor.options().validate()?;
        if !self.dump_dir.is_dir() {
            return Err(IngestError::NotFound {
                path: self.dump_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "dump directory does not exist",
                ),
            });
        }

        info!(
            dump_dir = %self.dump_dir.display(),
            database = %self.database_path.display(),
            tables = self.tables.len(),
            "loading dump"
        );

        let mut outcomes = Vec::with_capacity(self.tables.len());
        for schema in &self.tables {
            let csv_path = self.csv_path(schema);
            let result = self.load_table(schema, &csv_path);
            if let Err(err) = &result {
                error!(
                    table = %schema.table_name,
                    kind = err.kind(),
                    error = %err,
                    "table load failed"
                );
            }
            outcomes.push(TableOutcome::from_result(schema, csv_path, result));
        }

        Ok(LoadSummary {
            database_path: self.database_path.clone(),
            tables: outcomes,
        })
    }

    /// The database is only opened once the table's CSV is known to be readable
    fn load_table(&self, schema: &TableSchema, csv_path: &Path) -> Result<IngestReport> {
        std::fs::File::open(csv_path).map_err(|source| IngestError::NotFound {
            path: csv_path.to_path_buf(),
            source,
        })?;
        let table = SqliteTable::open(&self.database_path, schema.clone())?;
        self.ingestor.ingest_file(csv_path, schema.clone(), table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_csv_path_follows_table_name() {
        let loader =
            DumpLoader::new("/tmp/dump", "/tmp/out/database.sqlite", IngestOptions::default());
        assert_eq!(loader.database_path(), Path::new("/tmp/out/database.sqlite"));
        assert_eq!(
            loader.csv_path(&TableSchema::organizations()),
            PathBuf::from("/tmp/dump/organizations.csv")
        );
    }

    #[test]
    fn test_missing_dump_dir() {
        let temp_dir = TempDir::new().unwrap();
        let loader = DumpLoader::new(
            temp_dir.path().join("absent"),
            temp_dir.path().join(DATABASE_FILE),
            IngestOptions::default(),
        );
        assert!(matches!(loader.load(), Err(IngestError::NotFound { .. })));
    }

    #[test]
    fn test_bad_batch_size_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join(DATABASE_FILE);
        let options = IngestOptions::default().with_batch_size(0);
        let loader = DumpLoader::new(temp_dir.path(), &db, options);
        assert!(matches!(loader.load(), Err(IngestError::Config(_))));
        assert!(!db.exists());
    }

    #[test]
    fn test_empty_dump_dir_never_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("out").join(DATABASE_FILE);
        let summary = DumpLoader::new(temp_dir.path(), &db, IngestOptions::default())
            .load()
            .unwrap();

        assert!(!summary.all_succeeded());
        assert!(summary
            .tables
            .iter()
            .all(|t| t.error_kind.as_deref() == Some("not_found")));
        assert!(!db.exists());
    }

    #[test]
    fn test_with_tables_limits_the_load() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("organizations.csv"),
            "Index,Organization Id,Name,Website,Country,Description,Founded,Industry,\
             Number of employees\n\
             1,ORG1,Acme,https://acme.example.com,Chile,Anvils,1990,Tools,12\n",
        )
        .unwrap();
        let db = temp_dir.path().join(DATABASE_FILE);

        let summary = DumpLoader::new(temp_dir.path(), &db, IngestOptions::default())
            .with_tables(vec![TableSchema::organizations()])
            .load()
            .unwrap();

        assert!(summary.all_succeeded());
        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.records_inserted(), 1);
    }
}
