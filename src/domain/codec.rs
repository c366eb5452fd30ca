//! JSON encoding of ledger records.
//!
//! Records are stored as JSON objects. Unknown fields are ignored on read so
//! older or richer records still decode.

use super::key::KeySpace;
use crate::error::{LedgerError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An entity that lives in one key namespace of the record store.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Sized {
    const KEY_SPACE: KeySpace;

    fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::StoreFailure(Box::new(e)))
    }

    /// Decodes bytes read from `key`, reporting undecodable bytes as `Corrupt`.
    fn decode(key: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::corrupt(key, e))
    }
}
