//! Delivery domain module.
//!
//! This crate contains the delivery document model: outbound shipments raised
//! against a confirmed sales order, implemented purely as deterministic domain
//! logic (no IO, no storage).

pub mod document;

pub use document::{DeliveryDocId, DeliveryDocument, DeliveryLine, DeliveryStatus};
