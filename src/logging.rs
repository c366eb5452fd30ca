//! Structured logging setup.
//!
//! Logs always go to stderr so stdout stays reserved for response envelopes.

use std::io::IsTerminal;
use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// JSON objects, one per line
    Json,
}

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Environment filter (e.g. "info,market_ledger=debug"). Falls back to
    /// `RUST_LOG`, then to `warn`.
    pub filter: Option<String>,
    /// Whether to include file/line numbers
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: None,
            include_location: cfg!(debug_assertions),
        }
    }
}

pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Installs the global `tracing` subscriber.
pub fn init_logging(config: LogConfig) -> Result<(), InitError> {
    let env_filter = match config.filter {
        Some(filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Pretty => subscriber.pretty().try_init()?,
        LogFormat::Compact => subscriber.compact().try_init()?,
        LogFormat::Json => subscriber.json().try_init()?,
    }

    tracing::debug!(format = ?config.format, "logging initialized");
    Ok(())
}

/// Span wrapping one scripted invocation; `line` is its line in the script.
pub fn invocation_span(operation: &str, line: u64) -> Span {
    tracing::info_span!("invocation", operation = operation, line = line)
}
