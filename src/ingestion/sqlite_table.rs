//! SQLite Table - Sink backed by one table in a SQLite database

use crate::error::{IngestError, Result};
use crate::ingestion::record::Record;
use crate::ingestion::schema::TableSchema;
use crate::ingestion::sink::Sink;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

/// One destination table. Owns its connection for the lifetime of a session.
pub struct SqliteTable {
    schema: TableSchema,
    conn: Option<Connection>,
    insert_sql: String,
}

impl SqliteTable {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>, schema: TableSchema) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| IngestError::Persist(format!("Failed to open database: {}", e)))?;
        debug!(path = %path.display(), table = %schema.table_name, "opened database");
        Ok(Self::from_connection(conn, schema))
    }

    /// Private in-memory database, gone once the table is closed
    pub fn in_memory(schema: TableSchema) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, schema))
    }

    pub fn from_connection(conn: Connection, schema: TableSchema) -> Self {
        let insert_sql = insert_sql(&schema);
        Self {
            schema,
            conn: Some(conn),
            insert_sql,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Underlying connection, `None` after close
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub fn exists(&self) -> Result<bool> {
        let conn = self.live()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&self.schema.table_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn row_count(&self) -> Result<u64> {
        let conn = self.live()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.schema.table_name));
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn live(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| closed_error(&self.schema.table_name))
    }
}

impl Sink for SqliteTable {
    fn ensure_schema(&mut self) -> Result<()> {
        let ddl = create_table_sql(&self.schema);
        self.live()?.execute_batch(&ddl)?;
        info!(table = %self.schema.table_name, "table ready");
        Ok(())
    }

    fn insert(&mut self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = self.schema.table_name.clone();
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(closed_error(&table)),
        };

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                stmt.execute(params_from_iter(record.values.iter()))
                    .map_err(|e| {
                        IngestError::Persist(format!(
                            "insert into '{}' failed at line {}: {}",
                            table, record.line, e
                        ))
                    })?;
            }
        }
        tx.commit()?;
        debug!(table = %table, rows = records.len(), "batch written");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| IngestError::from(e))?;
            debug!(table = %self.schema.table_name, "connection closed");
        }
        Ok(())
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for a schema, with a surrogate `id` key
pub fn create_table_sql(schema: &TableSchema) -> String {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident("id"))];
    for col in &schema.columns {
        let mut def = format!("{} {}", quote_ident(&col.name), col.kind.sql_type());
        if !col.nullable {
            def.push_str(" NOT NULL");
        }
        columns.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(&schema.table_name),
        columns.join(",\n    ")
    )
}

fn insert_sql(schema: &TableSchema) -> String {
    let names: Vec<String> = schema.column_names().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&schema.table_name),
        names.join(", "),
        placeholders.join(", ")
    )
}

fn closed_error(table: &str) -> IngestError {
    IngestError::Persist(format!("connection for table '{}' is closed", table))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
