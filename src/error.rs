use thiserror::Error;

/// Errors produced by the ledger.
///
/// Every variant renders to a human-readable message; the dispatcher turns
/// them into failure envelopes so none of them escape to an invocation caller.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{key} not found")]
    NotFound { key: String },
    #[error("record {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("store failure: {0}")]
    StoreFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("partial commit: {applied} of {total} writes applied before failure: {source}")]
    PartialCommit {
        applied: usize,
        total: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("script error: {0}")]
    Input(#[from] csv::Error),
}

impl LedgerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::StoreFailure(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        Self::StoreFailure(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
