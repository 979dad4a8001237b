//! Purchasing domain module.
//!
//! This crate contains the purchase document model: inbound replenishment
//! received from suppliers, implemented purely as deterministic domain logic
//! (no IO, no storage).

pub mod document;

pub use document::{PurchaseDocId, PurchaseDocument, PurchaseLine, PurchaseStatus};
