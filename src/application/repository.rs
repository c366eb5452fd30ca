use crate::domain::codec::Record;
use crate::domain::ports::{RecordCursor, RecordStoreRef, WriteSet};
use crate::error::{LedgerError, Result};
use std::marker::PhantomData;
use tracing::debug;

/// Typed access to one entity kind in the record store.
///
/// Keys are checked against the entity's namespace before touching the
/// store, so an item can never be written under an account key or the
/// other way round.
pub struct Repository<E: Record> {
    store: RecordStoreRef,
    _kind: PhantomData<fn() -> E>,
}

impl<E: Record> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<E: Record> Repository<E> {
    pub fn new(store: RecordStoreRef) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Loads the record at `key`, or `None` when nothing is stored there.
    pub async fn find(&self, key: &str) -> Result<Option<E>> {
        E::KEY_SPACE.check(key)?;
        match self.store.get(key.as_bytes()).await? {
            Some(bytes) => E::decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Loads the record at `key`, failing with `NotFound` when absent.
    pub async fn get(&self, key: &str) -> Result<E> {
        self.find(key)
            .await?
            .ok_or_else(|| LedgerError::not_found(key))
    }

    /// Raw stored bytes, exactly as the store returns them.
    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        E::KEY_SPACE.check(key)?;
        self.store.get(key.as_bytes()).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Unconditional upsert.
    pub async fn put(&self, key: &str, value: &E) -> Result<()> {
        E::KEY_SPACE.check(key)?;
        self.store.put(key.as_bytes(), value.encode()?).await
    }

    /// Removes the record at `key`, failing with `NotFound` when absent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        if !self.exists(key).await? {
            return Err(LedgerError::not_found(key));
        }
        self.store.delete(key.as_bytes()).await?;
        debug!(kind = %E::KEY_SPACE, key, "record deleted");
        Ok(())
    }

    /// Every record of this kind in ascending key order.
    ///
    /// One range scan over the namespace; records are decoded lazily as the
    /// returned iterator is advanced.
    pub async fn list(&self) -> Result<Records<E>> {
        let (start, end) = E::KEY_SPACE.scan_bounds();
        let cursor = self.store.range_scan(&start, &end).await?;
        Ok(Records {
            cursor,
            _kind: PhantomData,
        })
    }

    /// Encodes `value` into `writes` without touching the store.
    pub fn stage_put(&self, writes: &mut WriteSet, key: &str, value: &E) -> Result<()> {
        E::KEY_SPACE.check(key)?;
        writes.put(key, value.encode()?);
        Ok(())
    }
}

/// Decoding iterator returned by [`Repository::list`].
pub struct Records<E: Record> {
    cursor: RecordCursor,
    _kind: PhantomData<fn() -> E>,
}

impl<E: Record> Iterator for Records<E> {
    type Item = Result<(String, E)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (raw_key, bytes) = self.cursor.next()?;
        let key = match String::from_utf8(raw_key) {
            Ok(key) => key,
            Err(e) => {
                let lossy = String::from_utf8_lossy(e.as_bytes()).into_owned();
                return Some(Err(LedgerError::corrupt(lossy, "key is not UTF-8")));
            }
        };
        Some(E::decode(&key, &bytes).map(|record| (key, record)))
    }
}
