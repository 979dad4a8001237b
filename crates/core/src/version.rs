//! Optimistic concurrency expectation for shared counters.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Version expectation checked before a stock write is applied.
///
/// `on_hand` is a shared mutable counter: two concurrent reservations must not
/// both observe the same balance and over-reserve. Writers read the item
/// version alongside the balance, then commit with `Exact(read_version)`; the
/// store rejects the whole write set when any expectation is stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent or single-writer paths).
    Any,
    /// Require the counter to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> LedgerResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(LedgerError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_every_version() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(17));
        assert!(ExpectedVersion::Any.check(99).is_ok());
    }

    #[test]
    fn exact_matches_only_its_version() {
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(3).matches(4));
        match ExpectedVersion::Exact(3).check(4) {
            Err(LedgerError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {other:?}"),
        }
    }
}
