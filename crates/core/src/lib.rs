//! Shared primitives for every stockledger crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the shared error taxonomy, the identifier newtype macro, and the
//! optimistic-concurrency version check used by stock writes.

pub mod error;
pub mod id;
pub mod version;

pub use error::{LedgerError, LedgerResult};
pub use version::ExpectedVersion;
