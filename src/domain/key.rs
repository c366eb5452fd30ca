use crate::error::{LedgerError, Result};
use std::fmt;

/// Width of the numeric suffix produced by [`KeySpace::sequence_key`].
///
/// Wide enough for any `u32` sequence number, so zero-padded keys keep
/// lexical and numeric order in step.
pub const SEQUENCE_WIDTH: usize = 10;

/// The two disjoint key namespaces of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySpace {
    Item,
    Account,
}

impl KeySpace {
    pub fn prefix(self) -> &'static str {
        match self {
            KeySpace::Item => "ITEM",
            KeySpace::Account => "USER",
        }
    }

    /// Returns `true` when `key` belongs to this namespace.
    pub fn contains(self, key: &str) -> bool {
        key.len() > self.prefix().len() && key.starts_with(self.prefix())
    }

    pub fn check(self, key: &str) -> Result<()> {
        if self.contains(key) {
            Ok(())
        } else {
            Err(LedgerError::invalid(format!(
                "{key:?} is not a {self} key (expected prefix {:?} followed by an identifier)",
                self.prefix()
            )))
        }
    }

    /// Half-open byte range `[start, end)` covering every key in the namespace.
    ///
    /// The upper bound is the prefix with its last byte incremented, so the
    /// scan is not limited to any particular key width.
    pub fn scan_bounds(self) -> (Vec<u8>, Vec<u8>) {
        let start = self.prefix().as_bytes().to_vec();
        let mut end = start.clone();
        // prefixes are uppercase ASCII, so the last byte never overflows
        if let Some(last) = end.last_mut() {
            *last += 1;
        }
        (start, end)
    }

    /// Builds a zero-padded key such as `ITEM0000000042`.
    pub fn sequence_key(self, sequence: u32) -> String {
        format!("{}{:0width$}", self.prefix(), sequence, width = SEQUENCE_WIDTH)
    }
}

impl fmt::Display for KeySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpace::Item => write!(f, "item"),
            KeySpace::Account => write!(f, "account"),
        }
    }
}
