use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// One pending write against the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl Mutation {
    pub fn key(&self) -> &[u8] {
        match self {
            Mutation::Put { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

/// Writes staged by one ledger transaction, committed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    mutations: Vec<Mutation>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: Vec<u8>) {
        self.mutations.push(Mutation::Put {
            key: key.into(),
            value,
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.mutations.push(Mutation::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Single-pass cursor over the `(key, value)` pairs of a range scan, in key order.
///
/// Once consumed it cannot be rewound; scan again for a fresh view.
///
/// Entries are owned: adapters copy the bounded range out of the store when
/// the scan is issued, so memory grows with the size of one namespace. Record
/// decoding stays lazy (see `Repository::list`).
pub struct RecordCursor {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl RecordCursor {
    pub fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for RecordCursor {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

/// Port to the key-value platform that holds ledger records.
///
/// Keys and values are opaque bytes here; typed access goes through the
/// entity repositories.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// Scans keys in `[start, end)` in ascending byte order.
    async fn range_scan(&self, start: &[u8], end: &[u8]) -> Result<RecordCursor>;

    /// Whether [`RecordStore::commit`] applies a write set all-or-nothing.
    fn atomic_commit(&self) -> bool {
        false
    }

    /// Applies every mutation of `writes`.
    ///
    /// The default applies them one at a time. Callers must finish all reads
    /// and validation first so this is the final step of a transaction. A
    /// failure after the first write is reported as `PartialCommit`; adapters
    /// with a native batch primitive override this and return `true` from
    /// [`RecordStore::atomic_commit`].
    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let total = writes.len();
        for (applied, mutation) in writes.into_mutations().into_iter().enumerate() {
            let label = String::from_utf8_lossy(mutation.key()).into_owned();
            let outcome = match mutation {
                Mutation::Put { key, value } => self.put(&key, value).await,
                Mutation::Delete { key } => self.delete(&key).await,
            };
            if let Err(err) = outcome {
                if applied == 0 {
                    return Err(err);
                }
                error!(applied, total, key = %label, error = %err, "partial commit");
                return Err(LedgerError::PartialCommit {
                    applied,
                    total,
                    source: Box::new(err),
                });
            }
        }
        Ok(())
    }
}

pub type RecordStoreRef = Arc<dyn RecordStore>;
