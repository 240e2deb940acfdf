//! url-table CLI - discover a table from a connection config and stream it as NDJSON
//!
//! Usage:
//!   url-table --config <connection.toml> [--schema-only] [--limit N] [--typed]
//!
//! The column definitions and diagnostics go to stderr; rows go to stdout, one JSON object per
//! line, in source order.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::{Map, Value};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

use url_table::config::ConnectionConfig;
use url_table::host::{Plugin, Table};
use url_table::ingestion::{IngestionSeverity, TracingObserver};
use url_table::types::Row;

#[derive(Parser)]
#[command(name = "url-table")]
#[command(about = "Discover a typed table from delimited text served over HTTP")]
#[command(version)]
struct Cli {
    /// Path to the connection config (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Print the column definitions only
    #[arg(long)]
    schema_only: bool,

    /// Stop after this many rows
    #[arg(short, long)]
    limit: Option<usize>,

    /// Emit values converted to the column types instead of raw strings
    #[arg(long)]
    typed: bool,
}

fn main() -> ExitCode {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match ConnectionConfig::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let plugin = match Plugin::new(config) {
        Ok(p) => p.with_observer(Arc::new(TracingObserver), IngestionSeverity::Critical),
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let (table, _discovery) = plugin.discover_table();
    for col in table.columns() {
        eprintln!("{}\t{}\t{}", col.name, col.column_type, col.accessor.key);
    }
    if cli.schema_only {
        return ExitCode::SUCCESS;
    }

    match write_rows(&table, cli.limit, cli.typed) {
        Ok(()) => ExitCode::SUCCESS,
        // A closed pipe (e.g. `| head`) is not an error.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed to write rows");
            ExitCode::FAILURE
        }
    }
}

fn write_rows(table: &Table, limit: Option<usize>, typed: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let limit = limit.unwrap_or(usize::MAX);
    let mut written = 0;
    let mut result = Ok(());

    table.list(|row| {
        if result.is_err() || written >= limit {
            return;
        }
        let line = if typed {
            serde_json::to_string(&typed_object(table, row))
        } else {
            serde_json::to_string(row)
        };
        result = line
            .map_err(io::Error::other)
            .and_then(|l| writeln!(out, "{l}"));
        written += 1;
    });

    result?;
    out.flush()
}

fn typed_object(table: &Table, row: &Row) -> Map<String, Value> {
    table
        .columns()
        .iter()
        .zip(table.project(row))
        .map(|(col, v)| {
            let value = serde_json::to_value(v).unwrap_or(Value::Null);
            (col.name.clone(), value)
        })
        .collect()
}
