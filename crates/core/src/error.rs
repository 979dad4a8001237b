//! Domain error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, recoverable business failures. Every
/// variant is surfaced to the calling workflow, which shows a message and lets
/// the operator correct input or retry; none should crash the host process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A value failed validation (e.g. malformed input, unmatched line under
    /// a strict matching policy).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced order, document, line, or item does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A document was asked to perform a transition its status forbids
    /// (e.g. confirming a non-draft order, receiving a received document).
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A delivery assignment exceeded the line's remaining quantity. Carries
    /// the actual remaining amount so the caller can clamp input.
    #[error("quantity exceeds remaining: requested {requested}, remaining {remaining}")]
    QuantityViolation { requested: i64, remaining: i64 },

    /// Optimistic concurrency check failed (stale stock version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A multi-line operation committed some lines and failed others.
    /// `applied`/`failed` carry document line numbers; failed entries keep
    /// the underlying error text. The operation is safe to retry: committed
    /// lines are skipped on the next attempt.
    #[error("operation partially applied: {} line(s) committed, {} failed", applied.len(), failed.len())]
    PartialFailure {
        applied: Vec<u32>,
        failed: Vec<(u32, String)>,
    },

    /// Underlying store failure (lock poisoning, malformed write set).
    #[error("storage failure: {0}")]
    Storage(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
