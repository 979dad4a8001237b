use thiserror::Error;

use stockledger_core::LedgerError;

/// Store operation error.
///
/// These are infrastructure errors (storage, concurrency) as opposed to the
/// domain errors the engines raise before a batch is ever built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency check failed: a stock row changed between the
    /// engine's read and the batch commit.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The batch would corrupt the ledger (quantity bounds, conflicting
    /// item link, illegal document transition). Always a caller bug, never
    /// user input.
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_write(msg: impl Into<String>) -> Self {
        Self::InvalidWrite(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Concurrency(msg) => LedgerError::conflict(msg),
            StoreError::NotFound(what) => LedgerError::not_found(what),
            StoreError::InvalidWrite(msg) => LedgerError::storage(msg),
            StoreError::Storage(msg) => LedgerError::storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_into_domain_error_taxonomy() {
        assert!(matches!(
            LedgerError::from(StoreError::concurrency("stock row moved")),
            LedgerError::Conflict(_)
        ));
        assert!(matches!(
            LedgerError::from(StoreError::not_found("item 42")),
            LedgerError::NotFound(_)
        ));
        assert!(matches!(
            LedgerError::from(StoreError::invalid_write("bounds")),
            LedgerError::Storage(_)
        ));
        assert!(matches!(
            LedgerError::from(StoreError::storage("lock poisoned")),
            LedgerError::Storage(_)
        ));
    }

    #[test]
    fn display_is_stable() {
        let err = StoreError::concurrency("expected Exact(3), found 5");
        assert_eq!(
            err.to_string(),
            "optimistic concurrency check failed: expected Exact(3), found 5"
        );
    }
}
