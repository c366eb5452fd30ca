use crate::domain::ports::{Mutation, RecordCursor, RecordStore, WriteSet};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, ReadOptions,
    WriteBatch,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Column Family holding every ledger record, items and accounts alike.
pub const CF_RECORDS: &str = "records";

/// A persistent record store backed by RocksDB.
///
/// Items and accounts share one column family and are told apart by key
/// prefix, which keeps range scans over a namespace a single ordered seek.
/// Write sets go through a RocksDB `WriteBatch`, so commits are atomic.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `records` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_records = ColumnFamilyDescriptor::new(CF_RECORDS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_records])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn records(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_RECORDS).ok_or_else(|| {
            LedgerError::StoreFailure(Box::new(std::io::Error::other(
                "Records column family not found",
            )))
        })
    }
}

#[async_trait]
impl RecordStore for RocksDBStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.records()?;
        Ok(self.db.get_cf(cf, key)?)
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let cf = self.records()?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        let cf = self.records()?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    async fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<RecordCursor> {
        let cf = self.records()?;
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_upper_bound(end.to_vec());

        // The iterator borrows the DB handle, so the range is copied out
        // before the cursor leaves this call.
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator_cf_opt(cf, read_opts, IteratorMode::From(start, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            entries.push((key.into_vec(), value.into_vec()));
        }
        Ok(RecordCursor::new(entries))
    }

    fn atomic_commit(&self) -> bool {
        true
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let cf = self.records()?;
        let total = writes.len();
        let mut batch = WriteBatch::default();
        for mutation in writes.into_mutations() {
            match mutation {
                Mutation::Put { key, value } => batch.put_cf(cf, key, value),
                Mutation::Delete { key } => batch.delete_cf(cf, key),
            }
        }
        self.db.write(batch)?;
        debug!(writes = total, "rocksdb batch committed");
        Ok(())
    }
}
