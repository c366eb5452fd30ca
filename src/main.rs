use clap::Parser;
use market_ledger::application::dispatcher::{Dispatcher, Response};
use market_ledger::application::engine::LedgerEngine;
use market_ledger::domain::ports::RecordStoreRef;
use market_ledger::infrastructure::in_memory::InMemoryRecordStore;
use market_ledger::interfaces::csv::invocation_reader::InvocationReader;
use market_ledger::logging::{LogConfig, LogFormat, init_logging, invocation_span};
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, error};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Invocation script: one CSV row per call, operation name first
    script: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Seed the demo catalogue before running the script
    #[arg(long)]
    seed: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Log filter directives; defaults to RUST_LOG, then "warn"
    #[arg(long)]
    log_filter: Option<String>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<RecordStoreRef> {
    use market_ledger::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(&path).into_diagnostic()?;
            tracing::info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<RecordStoreRef> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryRecordStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LogConfig {
        format: cli.log_format,
        filter: cli.log_filter,
        ..LogConfig::default()
    })
    .map_err(|e| miette!("failed to initialise logging: {e}"))?;

    let store = open_store(cli.db_path)?;
    let dispatcher = Dispatcher::new(LedgerEngine::new(store));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.seed {
        let response = dispatcher.invoke::<&str>("initLedger", &[]).await;
        writeln!(out, "{}", response.to_json_line()).into_diagnostic()?;
    }

    let file = File::open(&cli.script).into_diagnostic()?;
    let reader = InvocationReader::new(file);
    for (line, invocation) in reader.invocations() {
        let response = match invocation {
            Ok(invocation) => {
                dispatcher
                    .invoke(&invocation.operation, &invocation.args)
                    .instrument(invocation_span(&invocation.operation, line))
                    .await
            }
            Err(e) => {
                error!(line, error = %e, "Error reading invocation");
                Response::failure(format!("line {line}: {e}"))
            }
        };
        writeln!(out, "{}", response.to_json_line()).into_diagnostic()?;
    }

    out.flush().into_diagnostic()?;
    Ok(())
}
