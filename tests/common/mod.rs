#![allow(dead_code)]

use market_ledger::application::dispatcher::{Dispatcher, Response};
use market_ledger::application::engine::LedgerEngine;
use market_ledger::infrastructure::in_memory::InMemoryRecordStore;
use std::io::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Writes an invocation script, one row per call.
pub fn write_script(rows: &[&[&str]]) -> Result<NamedTempFile, Error> {
    let file = NamedTempFile::new()?;
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(file.path())?;
    for row in rows {
        wtr.write_record(*row)?;
    }
    wtr.flush()?;
    Ok(file)
}

pub fn in_memory_dispatcher() -> (Dispatcher, InMemoryRecordStore) {
    let store = InMemoryRecordStore::new();
    let engine = LedgerEngine::new(Arc::new(store.clone()));
    (Dispatcher::new(engine), store)
}

/// Parses the JSON-lines output of the binary.
pub fn envelopes(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

pub async fn expect_ok(dispatcher: &Dispatcher, op: &str, args: &[&str]) -> Response {
    let response = dispatcher.invoke(op, args).await;
    assert!(response.ok, "{op} {args:?} failed: {:?}", response.message);
    response
}
