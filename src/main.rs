use dumpload::ingestion::sqlite_table::create_table_sql;
use dumpload::ingestion::{IngestionStatus, TableSchema};
use dumpload::loader::DATABASE_FILE;
use dumpload::{CoercionPolicy, DumpLoader, IngestOptions, LoadSummary, DEFAULT_BATCH_SIZE};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dumpload")]
#[command(about = "Load an extracted CSV data dump into a SQLite database")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load customers.csv and organizations.csv from the dump directory
    Import {
        /// Directory holding the extracted dump
        #[arg(long, env = "DUMPLOAD_DUMP_DIR", default_value = "tmp/dump")]
        dump_dir: PathBuf,

        /// Directory the database file is written to
        #[arg(long, env = "DUMPLOAD_OUT_DIR", default_value = "out")]
        out_dir: PathBuf,

        /// Explicit database file (overrides --out-dir)
        #[arg(long)]
        database: Option<PathBuf>,

        /// Records per insert call
        #[arg(long, env = "DUMPLOAD_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Handling of non-numeric values in integer columns
        #[arg(
            long,
            env = "DUMPLOAD_ON_BAD_INTEGER",
            value_enum,
            default_value_t = CoercionPolicy::Forward
        )]
        on_bad_integer: CoercionPolicy,

        /// Print the load summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the CREATE TABLE statement of the dump tables
    Schema {
        /// Only this table (customers or organizations)
        #[arg(long)]
        table: Option<String>,
    },
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Import { dump_dir, out_dir, database, batch_size, on_bad_integer, json } => {
            let database = database.unwrap_or_else(|| out_dir.join(DATABASE_FILE));
            let options = IngestOptions::default()
                .with_batch_size(batch_size)
                .with_coercion(on_bad_integer);
            run_import(dump_dir, database, options, json)
        }
        Commands::Schema { table } => print_schema(table),
    }
}

fn run_import(
    dump_dir: PathBuf,
    database: PathBuf,
    options: IngestOptions,
    json: bool,
) -> Result<()> {
    info!("Loading dump from {}", dump_dir.display());

    let loader = DumpLoader::new(dump_dir, database, options);
    let summary = loader.load().context("Failed to load data dump")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if !summary.all_succeeded() {
        bail!("one or more tables failed to load");
    }
    Ok(())
}

fn print_summary(summary: &LoadSummary) {
    println!("\n=== Load Summary ===");
    println!("Database: {}", summary.database_path.display());
    for outcome in &summary.tables {
        match (&outcome.status, &outcome.report) {
            (IngestionStatus::Success, Some(report)) => {
                println!(
                    "  {:<15} {:>8} records in {:>5} batches ({} ms)",
                    outcome.table_name,
                    report.records_inserted,
                    report.batches_flushed,
                    report.elapsed_ms()
                );
                if report.malformed_values > 0 {
                    println!(
                        "  {:<15} {} non-integer values stored as NULL",
                        "", report.malformed_values
                    );
                }
            }
            _ => {
                println!(
                    "  {:<15} FAILED ({}): {}",
                    outcome.table_name,
                    outcome.error_kind.as_deref().unwrap_or("unknown"),
                    outcome.error.as_deref().unwrap_or("")
                );
            }
        }
    }
    println!("Total records: {}", summary.records_inserted());
}

fn print_schema(table: Option<String>) -> Result<()> {
    let schemas = match table {
        Some(name) => match TableSchema::by_name(&name) {
            Some(schema) => vec![schema],
            None => bail!("unknown table '{}'", name),
        },
        None => vec![TableSchema::customers(), TableSchema::organizations()],
    };
    for schema in schemas {
        println!("{};\n", create_table_sql(&schema));
    }
    Ok(())
}
