use crate::domain::ports::{Mutation, RecordCursor, RecordStore, WriteSet};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory record store.
///
/// Uses `Arc<RwLock<BTreeMap<..>>>` so clones share the same records and range
/// scans come back in key order. Write sets are applied under one write lock,
/// which makes commits atomic for every reader of the store.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl InMemoryRecordStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copies every record, for before/after comparisons.
    pub async fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(key.to_vec(), value);
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(key);
        Ok(())
    }

    async fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<RecordCursor> {
        if start >= end {
            return Ok(RecordCursor::new(Vec::new()));
        }
        let records = self.records.read().await;
        let entries = records
            .range(start.to_vec()..end.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(RecordCursor::new(entries))
    }

    fn atomic_commit(&self) -> bool {
        true
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut records = self.records.write().await;
        for mutation in writes.into_mutations() {
            match mutation {
                Mutation::Put { key, value } => {
                    records.insert(key, value);
                }
                Mutation::Delete { key } => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }
}
